mod app;
mod flows;
mod util;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;

use app::{CoordinatorConfig, LayoutParams};
use flows::{RecordSource, SurfaceSize};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON file of flow records; `-` reads stdin.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Number of synthetic flows to generate when no input is given.
    #[arg(long, default_value_t = 60)]
    demo: usize,
    #[arg(long, default_value_t = 1800.0, value_parser = parse_extent)]
    width: f32,
    #[arg(long, default_value_t = 1200.0, value_parser = parse_extent)]
    height: f32,
    #[arg(long, default_value_t = 300)]
    max_iterations: usize,
    #[arg(long, default_value_t = 20)]
    layout_timeout_secs: u64,
    /// Seed for initial node positions.
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_extent(raw: &str) -> Result<f32, String> {
    let value = raw
        .parse::<f32>()
        .map_err(|error| format!("`{raw}` is not a number: {error}"))?;
    if value.is_finite() && value >= 1.0 {
        Ok(value)
    } else {
        Err(format!("`{raw}` must be a finite size of at least 1"))
    }
}

impl Args {
    fn source(&self) -> RecordSource {
        match &self.input {
            Some(path) if path.as_os_str() == "-" => RecordSource::Stdin,
            Some(path) => RecordSource::File(path.clone()),
            None => RecordSource::Demo {
                records: self.demo,
            },
        }
    }

    fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            surface: SurfaceSize::new(self.width, self.height),
            params: LayoutParams {
                max_iterations: self.max_iterations,
                ..LayoutParams::default()
            },
            timeout: Duration::from_secs(self.layout_timeout_secs),
            seed: self.seed,
        }
    }
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let source = args.source();
    let config = args.coordinator_config();
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1600.0, 1000.0]),
        ..Default::default()
    };

    eframe::run_native(
        "traffic-graph",
        options,
        Box::new(move |cc| Ok(Box::new(app::TrafficGraphApp::new(cc, source, config)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_reads_stdin() {
        let args = Args::parse_from(["traffic-graph", "--input", "-"]);
        assert_eq!(args.source(), RecordSource::Stdin);
    }

    #[test]
    fn demo_is_the_fallback_source() {
        let args = Args::parse_from(["traffic-graph", "--demo", "12"]);
        assert_eq!(args.source(), RecordSource::Demo { records: 12 });

        let args = Args::parse_from(["traffic-graph", "--input", "flows.json"]);
        assert_eq!(args.source(), RecordSource::File(PathBuf::from("flows.json")));
    }

    #[test]
    fn surface_size_must_be_finite() {
        for bad in ["inf", "NaN", "0", "-20"] {
            assert!(
                Args::try_parse_from(["traffic-graph", "--width", bad]).is_err(),
                "accepted width {bad}"
            );
        }
        assert!(Args::try_parse_from(["traffic-graph", "--height", "inf"]).is_err());
        assert!(Args::try_parse_from(["traffic-graph", "--height", "640.5"]).is_ok());
    }

    #[test]
    fn flags_flow_into_coordinator_config() {
        let args = Args::parse_from([
            "traffic-graph",
            "--width",
            "800",
            "--height",
            "600",
            "--max-iterations",
            "50",
            "--layout-timeout-secs",
            "3",
            "--seed",
            "7",
        ]);
        let config = args.coordinator_config();

        assert_eq!(config.surface, SurfaceSize::new(800.0, 600.0));
        assert_eq!(config.params.max_iterations, 50);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.seed, Some(7));
    }
}
