use clap::Parser;
use location_coordinator::core::RawFix;
use location_coordinator::platform::{
    MockHost, MockLocationProvider, MockPermissionGate, MockServiceEnabler,
};
use location_coordinator::{
    CapabilityTier, CoordinatorConfig, LocationCoordinator, LocationResult, PermissionStatus,
    PositionRecord, ServiceStatus,
};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use tracing::info;

const DEMO_GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
/// Location Demo - runs a scripted location session against simulated platform services
struct Args {
    /// JSON configuration file
    #[clap(long)]
    config: Option<PathBuf>,

    /// Platform API level used to pick the capability tier
    #[clap(long)]
    api_level: Option<u32>,

    /// Deny the permission prompt
    #[clap(long)]
    deny_permission: bool,

    /// Start with location services switched off and decline the enable dialog
    #[clap(long)]
    service_disabled: bool,

    /// Number of fixes to stream
    #[clap(long, default_value_t = 3)]
    fixes: u32,
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_record(label: &str, result: LocationResult<PositionRecord>) {
    match result {
        Ok(record) => println!("{}: {}", label, record.to_json()),
        Err(e) => println!("{}: error {}", label, e),
    }
}

fn collect<T: Send + 'static>() -> (impl FnMut(LocationResult<T>) + Send + 'static, Receiver<LocationResult<T>>) {
    let (tx, rx) = mpsc::channel();
    (
        move |result: LocationResult<T>| {
            let _ = tx.send(result);
        },
        rx,
    )
}

fn demo_fix(step: u32) -> RawFix {
    let offset = step as f64 * 0.0001;
    RawFix::new(48.1173 + offset, 11.5167 + offset)
        .with_accuracy(4.5)
        .with_altitude(590.0)
        .with_motion(1.2, 90.0)
        .with_time(1_700_000_000_000 + step as i64 * 1000)
        .with_provider("fused")
        .with_accuracies(3.0, 10.0, 0.5)
        .with_elapsed_realtime(1_000_000_000 * (step as u64 + 1), Some(250_000.0))
        .with_satellites(9)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logging();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CoordinatorConfig::from_file(path)?,
        None => CoordinatorConfig::default(),
    };
    if let Some(level) = args.api_level {
        config.capabilities = CapabilityTier::from_api_level(level);
    }
    info!(capabilities = ?config.capabilities, "starting location session");

    let gate = MockPermissionGate::new(false);
    gate.set_rationale(true);
    let service = MockServiceEnabler::new(!args.service_disabled);
    let provider = MockLocationProvider::new();

    let mut coordinator = LocationCoordinator::new(
        config,
        Box::new(gate.clone()),
        Box::new(service.clone()),
        Box::new(provider.clone()),
    );
    coordinator.attach_host(Box::new(MockHost::new(true)));

    // Permission
    let (on_permission, permission_rx) = collect::<PermissionStatus>();
    coordinator.request_permission(on_permission);
    gate.answer(!args.deny_permission);
    coordinator.process_events();
    for result in permission_rx.try_iter() {
        match result {
            Ok(status) => println!("permission: {:?} ({})", status, status.code()),
            Err(e) => println!("permission: error {}", e),
        }
    }

    // Service
    let (on_service, service_rx) = collect::<ServiceStatus>();
    coordinator.request_service_enable(on_service);
    if service.pending_dialogs() > 0 {
        service.answer(false);
        coordinator.process_events();
    }
    for result in service_rx.try_iter() {
        match result {
            Ok(status) => println!("service: {:?} ({})", status, status.code()),
            Err(e) => println!("service: error {}", e),
        }
    }

    // One-shot request followed by a stream
    let (on_location, location_rx) = collect::<PositionRecord>();
    coordinator.get_location(None, on_location);
    let (on_stream, stream_rx) = collect::<PositionRecord>();
    coordinator.start_location_stream(None, on_stream);

    // Answer anything the location requests raised
    gate.answer(!args.deny_permission);
    service.answer(false);
    coordinator.process_events();

    provider.emit_sentence(DEMO_GGA);
    for step in 0..args.fixes {
        provider.emit_fix(demo_fix(step));
    }
    coordinator.process_events();
    coordinator.cancel_updates();

    for result in location_rx.try_iter() {
        print_record("location", result);
    }
    for result in stream_rx.try_iter() {
        print_record("stream", result);
    }

    info!(
        registrations = provider.registration_count(),
        prompts = gate.prompt_count(),
        dialogs = service.dialogs_shown(),
        "session finished"
    );
    Ok(())
}
