//! Dispatch, printing, mode changes, persistence, and the session loop.

mod common;

use std::io::Cursor;
use std::time::Duration;

use common::{FakeController, FakePorts, Harness};
use zwave_console_core::{Controller, ControllerMode, run_console};

fn connected(peers: &[u8]) -> Harness {
    let h = Harness::new(FakeController::with_nodes(peers), FakePorts::with(&["COM3"]));
    h.run(&["connect COM3"]);
    h
}

#[test]
fn unknown_command_keeps_console_running() {
    let h = Harness::new(FakeController::default(), FakePorts::default());
    let out = h.run(&["frobnicate now", "print version"]);
    assert!(out.contains("unknown command (frobnicate)"), "{out}");
    assert!(out.contains(&format!("v{}", zwave_console_core::VERSION)), "{out}");
}

#[test]
fn blank_lines_are_ignored() {
    let h = Harness::new(FakeController::default(), FakePorts::default());
    assert_eq!(h.run(&["", "   ", "\t\n"]), "");
}

#[test]
fn help_and_print_commands_agree() {
    let h = Harness::new(FakeController::default(), FakePorts::default());
    let help = h.run(&["HELP"]);
    let commands = h.run(&["print commands"]);
    assert!(help.contains("HELP"));
    assert_eq!(help, commands);
}

#[test]
fn print_serial_lists_ports() {
    let h = Harness::new(FakeController::default(), FakePorts::with(&["COM3", "COM4"]));
    let out = h.run(&["print serial"]);
    assert!(out.contains("   COM3"), "{out}");
    assert!(out.contains("   COM4"), "{out}");
}

#[test]
fn print_node_unknown_is_not_an_error() {
    let h = connected(&[5]);
    let out = h.run(&["print node 99", "print node 0x05"]);
    assert!(out.contains("There exists no node with id = 99"), "{out}");
    assert!(out.contains("NODE 5 | 0x10 | GENERIC_TYPE_SWITCH_BINARY"), "{out}");
}

#[test]
fn print_node_needs_an_id() {
    let h = connected(&[5]);
    let out = h.run(&["print node", "print node x"]);
    assert!(out.contains("use: print node <id>"), "{out}");
    assert!(out.contains("invalid node id (x)"), "{out}");
}

#[test]
fn print_nodes_skips_controller_entry() {
    let h = connected(&[]);
    assert!(
        h.run(&["print nodes"])
            .contains("No nodes connected to this controller")
    );

    let h = connected(&[5, 6]);
    let out = h.run(&["print nodes"]);
    assert!(out.contains("NODE 5"), "{out}");
    assert!(out.contains("NODE 6"), "{out}");
    assert!(!out.contains("NODE 1 "), "{out}");
}

#[test]
fn print_controller_requires_connection() {
    let h = Harness::new(FakeController::default(), FakePorts::with(&["COM3"]));
    let out = h.run(&["print controller"]);
    assert!(out.contains("Z-Wave Controller is not connected"), "{out}");

    let out = h.run(&["connect COM3", "print controller"]);
    assert!(out.contains("connected to port = COM3"), "{out}");
    assert!(out.contains("z-wave home id = 0xc0ffee01"), "{out}");
    assert!(out.contains("z-wave controller version = Z-Wave 4.05"), "{out}");
    assert!(out.contains("z-wave chip version = unknown"), "{out}");
    assert!(out.contains("mode = normal"), "{out}");
}

#[test]
fn unknown_print_target() {
    let h = Harness::new(FakeController::default(), FakePorts::default());
    let out = h.run(&["print everything", "print"]);
    assert!(out.contains("Unknown print command (everything)"), "{out}");
    assert!(out.contains("invalid print command"), "{out}");
}

#[test]
fn set_requires_connection() {
    let h = Harness::new(FakeController::default(), FakePorts::with(&["COM3"]));
    let out = h.run(&["set inclusion"]);
    assert!(out.contains("Controller is not connected"), "{out}");
    assert!(h.controller.state.lock().mode_calls.is_empty());
}

#[test]
fn set_modes() {
    let h = connected(&[]);
    let out = h.run(&["set inclusion", "set EXCLUSION", "set normal", "set sideways"]);
    assert!(out.contains("Setting inclusion mode"), "{out}");
    assert!(out.contains("Unknown set command (sideways)"), "{out}");
    assert_eq!(
        h.controller.state.lock().mode_calls,
        [
            ControllerMode::Inclusion,
            ControllerMode::Exclusion,
            ControllerMode::Normal
        ]
    );
}

#[test]
fn reset_requires_connection() {
    let h = Harness::new(FakeController::with_nodes(&[5]), FakePorts::with(&["COM3"]));
    let out = h.run(&["reset"]);
    assert!(out.contains("Controller is not connected"), "{out}");
    assert_eq!(h.controller.state.lock().resets, 0);

    h.run(&["connect COM3", "reset"]);
    assert_eq!(h.controller.state.lock().resets, 1);
    assert_eq!(h.controller.nodes().len(), 1);
}

#[test]
fn save_then_load_restores_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nodes.cfg");
    let h = connected(&[5, 6]);
    let line = format!("save {}", path.display());
    let out = h.run(&[line.as_str()]);
    assert!(out.contains("Configuration saved"), "{out}");

    h.controller.state.lock().nodes.clear();
    let line = format!("load {}", path.display());
    let out = h.run(&[line.as_str()]);
    assert!(out.contains("Configuration loaded"), "{out}");
    let ids: Vec<u8> = h.controller.nodes().iter().map(|n| n.id).collect();
    assert_eq!(ids, [1, 5, 6]);
}

#[test]
fn bare_save_uses_default_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nodes.xml");
    let h = Harness::with_config(
        FakeController::with_nodes(&[5]),
        FakePorts::with(&["COM3"]),
        path.clone(),
    );
    h.run(&["save"]);
    assert!(path.exists());
}

#[test]
fn load_missing_file_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.xml");
    let h = connected(&[5]);
    let out = h.run(&[format!("load {}", path.display()).as_str()]);
    assert!(out.contains("does not exist"), "{out}");
    assert_eq!(h.controller.nodes().len(), 2);
}

#[test]
fn load_requires_connection() {
    let h = Harness::new(FakeController::default(), FakePorts::default());
    let out = h.run(&["load"]);
    assert!(out.contains("Controller is not connected"), "{out}");
}

#[test]
fn save_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let h = connected(&[5]);
    // A directory cannot be written as a file.
    let out = h.run(&[format!("save {}", dir.path().display()).as_str()]);
    assert!(out.contains("failed to save configuration"), "{out}");
}

#[test]
fn exit_raises_shutdown() {
    let h = Harness::new(FakeController::default(), FakePorts::default());
    h.run(&["exit"]);
    assert!(h.session.shutdown().wait_timeout(Duration::from_millis(10)));
}

#[test]
fn session_loop_tears_down_on_exit() {
    let h = connected(&[5]);
    let input = Cursor::new("print node 5\nexit\nprint version\n");
    let mut out = Vec::new();
    run_console(&h.session, input, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("NODE 5"), "{text}");
    // Nothing after `exit` is dispatched.
    assert!(!text.contains(&format!("v{}", zwave_console_core::VERSION)), "{text}");
    assert!(h.controller.state.lock().disposed);
    assert_eq!(h.session.connection().current_port(), None);
    assert!(!h.ports.is_open("COM3"));
}

#[test]
fn session_loop_stops_at_end_of_input() {
    let h = Harness::new(FakeController::default(), FakePorts::default());
    let mut out = Vec::new();
    run_console(&h.session, Cursor::new("print version\n"), &mut out).unwrap();
    assert!(h.session.shutdown().is_raised());
    assert!(h.controller.state.lock().disposed);
}
