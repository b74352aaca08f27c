//! End-to-end session tests: authenticate, dump, decode.

use pretty_assertions::assert_eq;
use tincinfo_core::control::{ChannelOptions, ControlChannel};
use tincinfo_core::topology::RecordKind;
use tincinfo_core::{ControlError, DecodeError, Error, Session, UNKNOWN};
use tincinfo_test_utils::config::TestConfigBuilder;
use tincinfo_test_utils::tracing_setup::init_test_tracing;
use tincinfo_test_utils::{DaemonScript, FakeDaemon, PidFileFixture, TEST_COOKIE};

const NODES: &str = "\
18 3 alpha 0a1b2c3d4e5f myself port 655 0 0 0 0 700c 1a alpha alpha 0 1518 1518 1518 1700000000
18 3 beta 5f4e3d2c1b0a 192.0.2.7 port 655 5b 40 4 0 700c 1a beta beta 1 1459 1459 1518 1700000123
18 3 gamma 9f unknown port unknown 0 0 0 0 0 0 - - 99 0 0 1518 1700000456
18 3
";

const EDGES: &str = "\
18 4 alpha beta 192.0.2.7 port 655 10.0.0.1 port 40000 700c 12 3
18 4 beta alpha 10.0.0.1 port 655 192.0.2.7 port 655 700c 12 3
18 4 beta gamma 198.51.100.4 port 655 192.0.2.7 port 655 700c 40
18 4
";

const SUBNETS: &str = "\
18 5 10.1.0.0/16#10 alpha
18 5 10.2.0.0/16#10 beta
18 5 10.3.0.0/16#10 gamma
18 5 fd00::/64#10 alpha
18 5
";

const CONNECTIONS: &str = "\
18 6 beta 192.0.2.7 port 655 700c 5 1a
18 6 <control> localhost port unix 0 6 200
18 6
";

fn script() -> DaemonScript {
    DaemonScript::new()
        .accept_cookie(TEST_COOKIE)
        .respond("18 3", NODES)
        .respond("18 4", EDGES)
        .respond("18 5", SUBNETS)
        .respond("18 6", CONNECTIONS)
}

#[test_log::test]
fn test_open_from_config() {
    let fixture = PidFileFixture::new();
    let _daemon = FakeDaemon::start(&fixture.socket_path, script());

    let session = Session::open(&fixture.config()).unwrap();
    assert!(session.channel().is_connected());
    assert_eq!(session.channel().socket_path(), fixture.socket_path);
    assert!(session.registry().is_empty());
}

#[test_log::test]
fn test_refresh_all_requests_in_order() {
    let fixture = PidFileFixture::new();
    let daemon = FakeDaemon::start(&fixture.socket_path, script());

    let mut session = Session::open(&fixture.config()).unwrap();
    daemon.clear_received();
    session.refresh_all().unwrap();

    assert_eq!(daemon.received_text(), "18 6\n18 4\n18 5\n18 3\n");
}

#[test_log::test]
fn test_refresh_all_decodes_topology() {
    let fixture = PidFileFixture::new();
    let _daemon = FakeDaemon::start(&fixture.socket_path, script());

    let mut session = Session::open(&fixture.config()).unwrap();
    session.refresh_all().unwrap();

    let registry = session.registry();
    let names: Vec<_> = registry.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["alpha", "beta", "gamma"]);

    let alpha = registry.get("alpha").unwrap();
    assert_eq!(alpha.subnets(), ["10.1.0.0/16#10", "fd00::/64#10"]);
    assert_eq!(alpha.peer().unwrap().is_reachable(), Some(true));

    let gamma = registry.get("gamma").unwrap();
    let peer = gamma.peer().unwrap();
    assert_eq!(peer.port, Some(UNKNOWN));
    assert_eq!(peer.distance, Some(99));
    assert_eq!(peer.is_reachable(), Some(false));

    assert_eq!(session.edges().len(), 3);
    assert_eq!(session.connections().len(), 2);
    assert_eq!(session.connections()[1].node, "<control>");
    assert_eq!(session.connections()[1].port, Some(UNKNOWN));
    assert_eq!(session.connections()[1].status, Some(0x200));

    assert_eq!(session.max_weight(), Some(40));
    assert_eq!(session.min_weight(), Some(12));
    assert_eq!(session.edge_count("beta"), 2);
    assert_eq!(session.edge_count("gamma"), 0);
}

#[test_log::test]
fn test_refreshing_twice_does_not_duplicate() {
    let fixture = PidFileFixture::new();
    let _daemon = FakeDaemon::start(&fixture.socket_path, script());

    let mut session = Session::open(&fixture.config()).unwrap();
    session.refresh_all().unwrap();
    session.refresh_all().unwrap();

    assert_eq!(session.registry().len(), 3);
    assert_eq!(session.registry().get("alpha").unwrap().subnets().len(), 2);
    assert_eq!(session.edges().len(), 3);
    assert_eq!(session.connections().len(), 2);
}

#[test_log::test]
fn test_individual_refreshes() {
    let fixture = PidFileFixture::new();
    let _daemon = FakeDaemon::start(&fixture.socket_path, script());
    let mut session = Session::open(&fixture.config()).unwrap();

    let registry = session.refresh_nodes().unwrap();
    assert_eq!(registry.len(), 3);
    assert!(registry.get("beta").unwrap().subnets().is_empty());

    let registry = session.refresh_subnets().unwrap();
    assert_eq!(registry.get("beta").unwrap().subnets(), ["10.2.0.0/16#10"]);
    assert!(registry.get("beta").unwrap().peer().is_some());

    let edges = session.refresh_edges().unwrap();
    assert_eq!(edges[2].avg_rtt, None);

    let connections = session.refresh_connections().unwrap();
    assert_eq!(connections[0].socket.as_deref(), Some("5"));
}

#[test_log::test]
fn test_empty_dump_is_a_decode_error() {
    let fixture = PidFileFixture::new();
    let script = DaemonScript::new()
        .accept_cookie(TEST_COOKIE)
        .respond("18 3", NODES);
    let _daemon = FakeDaemon::start(&fixture.socket_path, script);

    let mut session = Session::open(&fixture.config()).unwrap();
    let err = session.refresh_all().unwrap_err();
    assert!(matches!(
        err,
        Error::Decode(DecodeError::NoData(RecordKind::Connections))
    ));
}

#[test_log::test]
fn test_start_without_daemon() {
    let fixture = PidFileFixture::new();
    let result = Session::open(&fixture.config());
    assert!(matches!(
        result,
        Err(Error::Control(ControlError::Connect { .. }))
    ));
}

#[test]
fn test_open_with_explicit_paths() {
    init_test_tracing();
    let fixture = PidFileFixture::new();
    let _daemon = FakeDaemon::start(&fixture.socket_path, script());

    // a netname that would derive different paths, overridden explicitly
    let config = TestConfigBuilder::new()
        .netname("othernet")
        .rundir("/nonexistent")
        .pid_file(&fixture.pid_file)
        .socket_path(&fixture.socket_path)
        .read_timeout_ms(50)
        .build();

    let mut session = Session::open(&config).unwrap();
    session.refresh_edges().unwrap();
    assert_eq!(session.max_weight(), Some(40));
}

#[test]
fn test_start_with_prepared_channel() {
    init_test_tracing();
    let fixture = PidFileFixture::new();
    let _daemon = FakeDaemon::start(&fixture.socket_path, script());

    let options = ChannelOptions {
        read_timeout: std::time::Duration::from_millis(50),
        ..ChannelOptions::default()
    };
    let channel = ControlChannel::open(&fixture.pid_file, &fixture.socket_path, options).unwrap();
    let mut session = Session::start(channel).unwrap();
    session.refresh_connections().unwrap();
    assert_eq!(session.connections()[0].node, "beta");
    session.close();
}
