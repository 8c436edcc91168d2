//! Line-command interpreter.
//!
//! [`Interpreter::execute`] tokenizes one line on whitespace and routes it by
//! its first token (case-insensitive). Handler errors are printed and
//! swallowed; nothing a line contains can stop the console except `exit`.

use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, error, warn};
use zwave_console_serial_link::LinkError;

use crate::binder::bind;
use crate::error::ConsoleError;
use crate::literal::parse_int;
use crate::render;
use crate::resolver::{DEFAULT_VERSION, resolve, version_option};
use crate::session::Session;

const SEND_USAGE: &str = "send <id> <cmd_class> <cmd> [-v=<version>] [[param_value]]";

type HandlerResult = Result<(), ConsoleError>;

/// Dispatches console lines against a [`Session`], writing to `W`.
#[derive(Debug)]
pub struct Interpreter<'s, W: Write> {
    session: &'s Session,
    out: W,
}

impl<'s, W: Write> Interpreter<'s, W> {
    /// An interpreter over `session` writing to `out`.
    pub fn new(session: &'s Session, out: W) -> Self {
        Self { session, out }
    }

    /// Consume the interpreter and return its output sink.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Execute one line. Blank lines are ignored.
    pub fn execute(&mut self, line: &str) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((first, args)) = tokens.split_first() else {
            return;
        };
        debug!(command = first, args = ?args, "dispatch");

        let result = match first.to_ascii_lowercase().as_str() {
            "connect" => self.connect(args),
            "print" => self.print(args),
            "set" => self.set(args),
            "send" => self.send(args),
            "load" => self.load(args),
            "save" => self.save(args),
            "reset" => self.reset(),
            "exit" => {
                self.session.shutdown().raise();
                Ok(())
            }
            "help" => render::help(&mut self.out).map_err(ConsoleError::from),
            _ => writeln!(
                self.out,
                "unknown command ({first}). Type 'print commands' for a list of possible commands."
            )
            .map_err(ConsoleError::from),
        };

        if let Err(e) = result {
            self.report(&e);
        }
        if let Err(e) = self.out.flush() {
            error!(error = %e, "failed to flush console output");
        }
    }

    fn report(&mut self, e: &ConsoleError) {
        debug!(error = ?e, "command failed");
        if let ConsoleError::Output(io) = e {
            error!(error = %io, "console output failed");
            return;
        }
        if let Err(io) = writeln!(self.out, "Error: {e}") {
            error!(error = %io, "console output failed");
        }
    }

    fn require_connection(&self) -> HandlerResult {
        if self.session.connection().is_connected() {
            Ok(())
        } else {
            Err(ConsoleError::NotConnected)
        }
    }

    // ── connect ──────────────────────────────────────────────────────────

    fn connect(&mut self, args: &[&str]) -> HandlerResult {
        let Some(&port) = args.first() else {
            return Err(ConsoleError::Usage {
                command: "connect",
                usage: "connect <portname>",
            });
        };
        writeln!(self.out, "Connecting to {port}")?;
        let connection = self.session.connection();
        match connection.connect(port) {
            Ok(_) => {
                writeln!(self.out, "Connected to {port} ({})", connection.settings())?;
                Ok(())
            }
            Err(ConsoleError::Link(e @ LinkError::PortNotFound { .. })) => {
                writeln!(self.out, "Error: {e}.")?;
                writeln!(
                    self.out,
                    "    ==>Type 'print serial' to get a list of available serial ports."
                )?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    // ── print ────────────────────────────────────────────────────────────

    fn print(&mut self, args: &[&str]) -> HandlerResult {
        let Some(what) = args.first() else {
            return Err(ConsoleError::Usage {
                command: "print",
                usage: "print version | serial | commands | nodes | node <id> | controller",
            });
        };
        match what.to_ascii_lowercase().as_str() {
            "version" => writeln!(self.out, "v{}", crate::VERSION)?,
            "serial" => {
                let names = self.session.connection().list_ports();
                render::ports(&mut self.out, &names)?;
            }
            "commands" => render::help(&mut self.out)?,
            "nodes" => self.print_nodes()?,
            "node" => {
                let [_, id] = args else {
                    return Err(ConsoleError::Usage {
                        command: "print node",
                        usage: "print node <id>",
                    });
                };
                self.print_node(id)?;
            }
            "controller" => self.print_controller()?,
            _ => return Err(ConsoleError::UnknownPrintCommand((*what).to_string())),
        }
        Ok(())
    }

    fn print_nodes(&mut self) -> HandlerResult {
        let controller = self.session.controller();
        let own = controller.own_node_id();
        let nodes: Vec<_> = controller
            .nodes()
            .into_iter()
            .filter(|n| Some(n.id) != own)
            .collect();
        if nodes.is_empty() {
            writeln!(self.out, "No nodes connected to this controller")?;
            return Ok(());
        }
        for node in &nodes {
            writeln!(self.out)?;
            render::node(&mut self.out, node, self.session.spec())?;
        }
        Ok(())
    }

    fn print_node(&mut self, token: &str) -> HandlerResult {
        let id = parse_int(token).map_err(|_| ConsoleError::InvalidNodeId {
            token: token.to_string(),
        })?;
        let node = u8::try_from(id)
            .ok()
            .and_then(|id| self.session.controller().node(id));
        match node {
            Some(node) => render::node(&mut self.out, &node, self.session.spec())?,
            None => writeln!(self.out, "There exists no node with id = {id}")?,
        }
        Ok(())
    }

    fn print_controller(&mut self) -> HandlerResult {
        let connection = self.session.connection();
        let port = match connection.current_port() {
            Some(port) if connection.is_connected() => port,
            _ => {
                writeln!(
                    self.out,
                    "Z-Wave Controller is not connected. Connect the controller to a serial port (use cmd \"connect <portname>\")"
                )?;
                return Ok(());
            }
        };
        render::controller_details(&mut self.out, &port, self.session.controller())?;
        Ok(())
    }

    // ── set ──────────────────────────────────────────────────────────────

    fn set(&mut self, args: &[&str]) -> HandlerResult {
        self.require_connection()?;
        let Some(mode) = args.first() else {
            return Err(ConsoleError::Usage {
                command: "set",
                usage: "set inclusion | exclusion | normal",
            });
        };
        let _active = self.session.connection().activity();
        let controller = self.session.controller();
        match mode.to_ascii_lowercase().as_str() {
            "inclusion" => {
                writeln!(self.out, "Setting inclusion mode")?;
                controller.set_inclusion_mode()?;
            }
            "exclusion" => {
                writeln!(self.out, "Setting exclusion mode")?;
                controller.set_exclusion_mode()?;
            }
            "normal" => {
                writeln!(self.out, "Setting controller back to normal mode")?;
                controller.set_normal_mode()?;
            }
            _ => return Err(ConsoleError::UnknownSetCommand((*mode).to_string())),
        }
        Ok(())
    }

    // ── send ─────────────────────────────────────────────────────────────

    fn send(&mut self, args: &[&str]) -> HandlerResult {
        let [node_token, class_token, command_token, rest @ ..] = args else {
            return Err(ConsoleError::Usage {
                command: "send",
                usage: SEND_USAGE,
            });
        };

        let id = parse_int(node_token).map_err(|_| ConsoleError::InvalidNodeId {
            token: (*node_token).to_string(),
        })?;
        let node = u8::try_from(id)
            .ok()
            .and_then(|id| self.session.controller().node(id))
            .ok_or(ConsoleError::UnknownNode { id })?;

        let (version, values) = match rest.split_first() {
            Some((option, values)) => match version_option(option) {
                Some(Ok(version)) => (version, values),
                Some(Err(e)) => {
                    warn!(token = option, error = %e, "invalid version option");
                    writeln!(
                        self.out,
                        "Invalid version parameter ({option}), using version {DEFAULT_VERSION}"
                    )?;
                    (DEFAULT_VERSION, values)
                }
                None => (DEFAULT_VERSION, rest),
            },
            None => (DEFAULT_VERSION, rest),
        };

        let resolved = resolve(self.session.spec(), class_token, command_token, version)?;
        let command = bind(resolved, values)?;

        let _active = self.session.connection().activity();
        debug!(
            node = node.id,
            class = command.class_key(),
            command = command.command_key(),
            values = ?command.values(),
            "transmit"
        );
        self.session.controller().transmit(node.id, command)?;
        Ok(())
    }

    // ── save / load / reset ──────────────────────────────────────────────

    fn config_path(&self, args: &[&str]) -> PathBuf {
        args.first()
            .map_or_else(|| self.session.config_path().clone(), PathBuf::from)
    }

    fn save(&mut self, args: &[&str]) -> HandlerResult {
        let path = self.config_path(args);
        writeln!(self.out, "Saving nodes configuration")?;
        self.session.controller().save_configuration(&path)?;
        writeln!(self.out, "Configuration saved to {}", path.display())?;
        Ok(())
    }

    fn load(&mut self, args: &[&str]) -> HandlerResult {
        self.require_connection()?;
        let path = self.config_path(args);
        writeln!(self.out, "Loading nodes configuration")?;
        if !path.exists() {
            return Err(ConsoleError::ConfigFileMissing { path });
        }
        let _active = self.session.connection().activity();
        self.session.controller().load_configuration(&path)?;
        writeln!(self.out, "Configuration loaded from {}", path.display())?;
        Ok(())
    }

    fn reset(&mut self) -> HandlerResult {
        self.require_connection()?;
        let _active = self.session.connection().activity();
        writeln!(self.out, "Resetting the controller")?;
        self.session.controller().reset()?;
        Ok(())
    }
}
