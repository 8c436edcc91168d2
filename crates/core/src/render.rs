//! Plain-text rendering of console output.

use std::io::{self, Write};

use zwave_console_spec_tables::CommandClassSpecification;

use crate::controller::Controller;
use crate::model::Node;

const HELP: &str = "\
=======================================================================================
                                        HELP
=======================================================================================

       save = saving nodes configuration
              ==> use: save [filename]
       load = loading nodes configuration
              ==> use: load [filename]

        set = sets controller mode
              ==> use: set <mode>
              set inclusion    = sets controller to inclusion mode
              set exclusion    = sets controller to exclusion mode
              set normal       = sets controller to normal mode

      reset = resets the controller

    connect = connect with z-wave controller
              ==> use: connect <portname>

       send = sends a command to a node
              ==> use: send <id> <cmd_class> <cmd> [-v=<version>] [[param_value]]

      print = prints something on the console
              ==> use: print <what to print> [[additional params]]
              print commands   = prints this help
              print serial     = prints all available serial ports
              print version    = prints the version of this application
              print nodes      = prints all node details
              print node <id>  = prints the node details of specific node
              print controller = prints details about the current z-wave controller

       exit = disconnects and quits the console
=======================================================================================";

const RULE: &str =
    "---------------------------------------------------------------------------";
const DOUBLE_RULE: &str =
    "===========================================================================";

/// The command reference shown by `help` and `print commands`.
pub fn help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{HELP}")
}

/// The `print serial` port listing.
pub fn ports(out: &mut impl Write, names: &[String]) -> io::Result<()> {
    writeln!(out, "available serial ports:")?;
    writeln!(out, "-----------------------------------")?;
    for name in names {
        writeln!(out, "   {name}")?;
    }
    writeln!(out, "-----------------------------------")
}

/// One node's detail block.
pub fn node(out: &mut impl Write, node: &Node, spec: &CommandClassSpecification) -> io::Result<()> {
    let device = spec
        .device_type(node.device_type)
        .map_or("UNKNOWN_DEVICE_TYPE", |d| d.name.as_str());
    writeln!(out, "{DOUBLE_RULE}")?;
    writeln!(
        out,
        "             NODE {} | 0x{:02x} | {device}",
        node.id, node.device_type
    )?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "    Manufacturer 0x{:04x}", node.manufacturer_id)?;
    writeln!(out, "    Product Type 0x{:04x}", node.product_type_id)?;
    writeln!(out, "         Product 0x{:04x}", node.product_id)?;
    writeln!(out, "{RULE}")?;
    writeln!(out, " COMMAND CLASSES")?;
    for &key in &node.command_classes {
        let name = spec.command_class_name(key).unwrap_or("UNKNOWN");
        writeln!(out, "   0x{key:02x} {name}")?;
    }
    writeln!(out, "{RULE}")
}

/// The `print controller` detail block.
pub fn controller_details(
    out: &mut impl Write,
    port: &str,
    controller: &dyn Controller,
) -> io::Result<()> {
    let home_id = controller
        .home_id()
        .map_or_else(|| "unknown".to_string(), |id| format!("0x{id:08x}"));
    let unknown = || "unknown".to_string();
    let version = controller.controller_version().unwrap_or_else(unknown);
    let chip = controller.chip_version().unwrap_or_else(unknown);

    writeln!(out, "--------------------------------------------------")?;
    writeln!(out, "                  Controller Details")?;
    writeln!(out, "--------------------------------------------------")?;
    writeln!(out)?;
    writeln!(out, "          connected to port = {port}")?;
    writeln!(out, "             z-wave home id = {home_id}")?;
    writeln!(out, "  z-wave controller version = {version}")?;
    writeln!(out, "        z-wave chip version = {chip}")?;
    writeln!(out, "                       mode = {}", controller.mode())?;
    writeln!(out, "--------------------------------------------------")
}
