mod args;

use std::{fs, path::Path};

use clap::Parser;
use color_eyre::Result;
use linearscan_allocator::{LinearScan, Report};
use linearscan_builder::IntervalBuilder;
use linearscan_config::{Config, ConfigOptions};
use linearscan_pipeline::Pipeline;
use ron::ser::PrettyConfig;
use serde::Serialize as _;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_indicatif::{IndicatifLayer, style::ProgressStyle};
use tracing_subscriber::{
	EnvFilter,
	fmt::{self, format::FmtSpan},
	prelude::*,
};

use self::args::Args;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<()> {
	let args = match Args::try_parse() {
		Ok(a) => a,
		Err(e) => {
			eprintln!("{e}");
			return Ok(());
		}
	};

	install_tracing(&args.output_path)?;
	color_eyre::install()?;

	let raw_pipeline = fs::read_to_string(&args.file_path)?;
	let pipeline = ron::from_str::<Pipeline>(&raw_pipeline)?;

	let options = match &args.config_path {
		Some(path) => toml::from_str::<ConfigOptions>(&fs::read_to_string(path)?)?,
		None => ConfigOptions::default(),
	};

	info!(
		nodes = pipeline.nodes.len(),
		blocks = pipeline.blocks.len(),
		registers = options.registers.len(),
		"loaded pipeline"
	);

	let mut config = Config::new(&pipeline, &options)?;

	IntervalBuilder::new(&mut config).build_intervals()?;
	serialize_report(&Report::new(&config, &[]), &args.output_path, "intervals")?;

	let mut allocator = LinearScan::new(&mut config);
	allocator.allocate()?;
	let fixed = allocator.fixed_intervals().to_vec();

	serialize_report(&Report::new(&config, &fixed), &args.output_path, "allocation")?;

	Ok(())
}

fn install_tracing(output_path: &Path) -> Result<()> {
	fs::create_dir_all(output_path)?;

	let log_file = fs::OpenOptions::new()
		.create(true)
		.write(true)
		.truncate(true)
		.open(output_path.join("output.log"))?;

	let json_log_file = fs::OpenOptions::new()
		.create(true)
		.truncate(true)
		.write(true)
		.open(output_path.join("output.json"))?;

	let indicatif_layer = IndicatifLayer::new().with_progress_style(
		ProgressStyle::with_template("{span_child_prefix}{spinner} {span_name} [{elapsed_precise}]")?
			.progress_chars("#>-"),
	);

	let file_layer = fmt::layer().with_ansi(false).with_writer(log_file);

	let filter_layer = EnvFilter::new("info");
	let fmt_layer = fmt::layer()
		.with_target(false)
		.compact()
		.with_writer(indicatif_layer.get_stderr_writer())
		.with_filter(filter_layer);

	let json_file_layer = fmt::layer()
		.with_ansi(false)
		.json()
		.flatten_event(true)
		.with_span_events(FmtSpan::FULL)
		.with_writer(json_log_file);

	tracing_subscriber::registry()
		.with(json_file_layer)
		.with(file_layer)
		.with(fmt_layer)
		.with(indicatif_layer)
		.with(ErrorLayer::default())
		.init();

	Ok(())
}

fn serialize_report(report: &Report, output_path: &Path, file_name: &str) -> Result<()> {
	let mut output = String::new();
	let mut serializer = ron::Serializer::with_options(
		&mut output,
		Some(PrettyConfig::new().separate_tuple_members(true)),
		&ron::Options::default(),
	)?;

	report.serialize(&mut serializer)?;

	fs::write(output_path.join(format!("{file_name}.ron")), output)?;

	info!(file_name, "wrote report");

	Ok(())
}
