use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
	/// Pipeline to allocate, in RON.
	pub file_path: PathBuf,
	/// Register and opcode description, in TOML. Without it no registers are available.
	#[arg(short, long = "config")]
	pub config_path: Option<PathBuf>,
	/// Directory receiving the logs and the interval reports.
	#[arg(short, long)]
	pub output_path: PathBuf,
}
