//! motion-sense - Debounced motion detection from location streams
//!
//! Classifies live or recorded location sample streams into a stable
//! moving/stationary signal.

use motion_sense::app::cli::{Cli, Commands, ConfigAction};
use motion_sense::app::config::Config;
use motion_sense::ingest::provider::{LocationProvider, ReplayPacing, ReplayProvider};
use motion_sense::ingest::ring_buffer::SampleRingBuffer;
use motion_sense::ingest::types::{GeoPoint, LocationSample, ProviderEvent};
use motion_sense::time::MonotonicClock;
use motion_sense::workflow::monitor::MotionMonitor;
use motion_sense::workflow::track::{TrackLog, CHECKPOINT_INTERVAL};
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    // Initialize tracing (--verbose enables debug-level output)
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Load config
    let config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_default()?
    };

    // Execute command
    match cli.command {
        Commands::Watch { output, note } => {
            run_watch(output, note, &config)?;
        }
        Commands::Replay { input, rate, fast } => {
            run_replay(&input, rate, fast, &config)?;
        }
        Commands::Analyze { input } => {
            run_analyze(&input, &config)?;
        }
        Commands::List { detailed } => {
            run_list(detailed)?;
        }
        Commands::Init { force } => {
            run_init(force, &config)?;
        }
        Commands::Config { action } => {
            run_config(action, &config)?;
        }
    }

    Ok(())
}

fn run_watch(output: Option<String>, note: Option<String>, config: &Config) -> anyhow::Result<()> {
    let tracks_dir = Cli::tracks_dir();
    std::fs::create_dir_all(&tracks_dir)?;

    // Recover any capture that died before finalizing its checkpoint
    for (tmp_path, orphan) in TrackLog::recover_checkpoints(&tracks_dir) {
        let final_path = tmp_path.with_extension("");
        info!(
            "Recovering interrupted capture '{}' ({} samples)",
            orphan.metadata.name,
            orphan.len()
        );
        TrackLog::finalize_checkpoint(&final_path)?;
    }

    let track_name = output.unwrap_or_else(|| {
        chrono::Local::now().format("track_%Y%m%d_%H%M%S").to_string()
    });
    let track_path = tracks_dir.join(format!("{}.json", track_name));
    let mut track = TrackLog::new(track_name.clone(), note);

    let buffer = SampleRingBuffer::with_capacity(config.stream.buffer_size);
    let (mut producer, mut consumer) = buffer.split();

    let mut monitor = MotionMonitor::new(config.classifier.to_motion_config());
    let signal = monitor.signal();
    signal.subscribe(|state| println!("  -> {}", state));

    info!("Watching for samples on stdin (JSON lines). Press Ctrl+C to stop");

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_handler = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        stop_flag_handler.store(true, Ordering::SeqCst);
    })?;

    // Reader thread: stdin lines -> parsed samples -> buffer.
    // Detached rather than joined: a blocked stdin read cannot be
    // interrupted portably, and the process exits right after the loop.
    let reader_done = Arc::new(AtomicBool::new(false));
    let reader_done_flag = Arc::clone(&reader_done);
    let reader_stop = Arc::clone(&stop_flag);
    let distance_filter = config.stream.distance_filter_m;

    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            let mut last_emitted: Option<GeoPoint> = None;

            for line in stdin.lock().lines() {
                if reader_stop.load(Ordering::SeqCst) {
                    break;
                }
                match line {
                    Ok(l) if l.trim().is_empty() => continue,
                    Ok(l) => match serde_json::from_str::<LocationSample>(&l) {
                        Ok(sample) => {
                            if distance_filter > 0.0 {
                                if let Some(prev) = &last_emitted {
                                    if sample.position.distance_m(prev) < distance_filter {
                                        continue;
                                    }
                                }
                            }
                            last_emitted = Some(sample.position);
                            producer.push(ProviderEvent::Sample(sample));
                        }
                        Err(e) => {
                            warn!("Skipping malformed sample line: {}", e);
                        }
                    },
                    Err(e) => {
                        producer.push(ProviderEvent::Failure(format!("stdin read error: {}", e)));
                        break;
                    }
                }
            }
            reader_done_flag.store(true, Ordering::SeqCst);
        })?;

    let clock = MonotonicClock::new();
    let poll = Duration::from_millis(config.stream.poll_interval_ms);

    // Classify loop
    loop {
        let batch = consumer.pop_batch(256);
        for slot in batch {
            if let ProviderEvent::Sample(sample) = &slot.event {
                track.push_sample(*sample);
                if track.len() % CHECKPOINT_INTERVAL == 0 {
                    if let Err(e) = track.save_checkpoint(&track_path) {
                        warn!("Checkpoint save failed: {}", e);
                    }
                }
            }
            monitor.handle_event(slot.event);
        }

        if stop_flag.load(Ordering::SeqCst) {
            break;
        }
        if reader_done.load(Ordering::SeqCst) && consumer.is_empty() {
            break;
        }

        std::thread::sleep(poll);
    }

    let elapsed_ms = clock.now().as_millis();
    track.finalize(elapsed_ms);

    info!("Capture stopped after {:.1}s", elapsed_ms as f64 / 1_000.0);
    info!("Captured {} samples", track.len());

    track.save(&track_path)?;
    TrackLog::remove_checkpoint(&track_path);
    info!("Saved track to {:?}", track_path);

    print_report(&track_name, track.recorded_span(), &monitor);
    Ok(())
}

fn run_replay(
    input: &Path,
    rate: Option<f64>,
    fast: bool,
    config: &Config,
) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!("Track log not found: {:?}", input);
    }

    let track = TrackLog::load(input)?;
    if track.is_empty() {
        anyhow::bail!("Track '{}' has no samples", track.metadata.name);
    }

    info!(
        "Replaying track '{}' ({} samples, {:.1}s recorded)",
        track.metadata.name,
        track.len(),
        track.recorded_span().as_secs_f64()
    );

    let pacing = if fast {
        ReplayPacing::Fast
    } else {
        let rate = rate.unwrap_or(config.replay.rate);
        if rate <= 0.0 {
            anyhow::bail!("Replay rate must be positive, got {}", rate);
        }
        ReplayPacing::Recorded { rate }
    };

    let buffer = SampleRingBuffer::with_capacity(config.stream.buffer_size);
    let (producer, mut consumer) = buffer.split();

    let mut monitor = MotionMonitor::new(config.classifier.to_motion_config());
    let signal = monitor.signal();
    signal.subscribe(|state| println!("  -> {}", state));

    // No distance filter on replay: the track already holds exactly what
    // the capture-side filter let through, and replay must classify it
    // identically to `analyze`.
    let mut provider = ReplayProvider::new(track.samples.clone()).with_pacing(pacing);
    provider.request_authorization();
    provider.start(producer)?;

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_handler = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        stop_flag_handler.store(true, Ordering::SeqCst);
    })?;

    let poll = Duration::from_millis(config.stream.poll_interval_ms);

    loop {
        monitor.drain(&mut consumer);

        if stop_flag.load(Ordering::SeqCst) {
            provider.stop();
        }
        if !provider.is_running() && consumer.is_empty() {
            break;
        }

        std::thread::sleep(poll);
    }

    provider.stop();
    monitor.drain(&mut consumer);

    print_report(&track.metadata.name, track.recorded_span(), &monitor);
    Ok(())
}

fn run_analyze(input: &Path, config: &Config) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!("Track log not found: {:?}", input);
    }

    let track = TrackLog::load(input)?;
    info!(
        "Loaded track '{}' with {} samples",
        track.metadata.name,
        track.len()
    );

    let mut monitor = MotionMonitor::new(config.classifier.to_motion_config());
    for sample in &track.samples {
        monitor.handle_event(ProviderEvent::Sample(*sample));
    }

    print_report(&track.metadata.name, track.recorded_span(), &monitor);
    Ok(())
}

/// Print the transition list and run summary.
fn print_report(name: &str, span: Duration, monitor: &MotionMonitor) {
    let summary = monitor.summary();

    println!("\nMotion Report: {}", name);
    println!("  Samples:     {}", summary.samples_processed);
    println!("  Span:        {:.1}s", span.as_secs_f64());
    println!("  Transitions: {}", summary.transitions);

    for (ts, state) in monitor.transitions() {
        println!("    {:>8.1}s  -> {}", ts.as_millis() as f64 / 1_000.0, state);
    }

    let span_secs = span.as_secs_f64();
    let moving_secs = summary.moving_time.as_secs_f64();
    if span_secs > 0.0 {
        println!(
            "  Time moving: {:.1}s ({:.0}%)",
            moving_secs,
            100.0 * moving_secs / span_secs
        );
    } else {
        println!("  Time moving: {:.1}s", moving_secs);
    }
    if summary.failures > 0 {
        println!("  Failures:    {}", summary.failures);
    }
    println!("  Final state: {}", summary.final_state);
}

fn run_list(detailed: bool) -> anyhow::Result<()> {
    let tracks_dir = Cli::tracks_dir();

    if !tracks_dir.exists() {
        println!("No tracks found in {}", tracks_dir.display());
        println!("Capture one with: motion-sense watch");
        return Ok(());
    }

    println!("Tracks in {:?}:", tracks_dir);

    let mut entries: Vec<_> = std::fs::read_dir(&tracks_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();

    entries.sort_by_key(|e| e.path());

    for entry in &entries {
        let path = entry.path();
        let file_name = path.file_name().unwrap_or_default().to_string_lossy();

        if detailed {
            match TrackLog::load(&path) {
                Ok(track) => {
                    let m = &track.metadata;
                    let duration_secs = m.duration_ms as f64 / 1000.0;
                    let note_str = m.note.as_deref().unwrap_or("-");
                    println!(
                        "  {}  ({} samples, {:.1}s, note: {})",
                        file_name, m.sample_count, duration_secs, note_str
                    );
                }
                Err(_) => {
                    let fs_meta = entry.metadata()?;
                    println!("  {}  ({} bytes, failed to parse)", file_name, fs_meta.len());
                }
            }
        } else {
            println!("  {}", file_name);
        }
    }

    if entries.is_empty() {
        println!("  (none)");
        println!("Capture one with: motion-sense watch");
    }

    Ok(())
}

fn run_init(force: bool, config: &Config) -> anyhow::Result<()> {
    let config_path = Config::default_path();

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {:?}. Use --force to overwrite.",
            config_path
        );
    }

    config.save_default()?;
    println!("Created config at {:?}", config_path);
    println!("\nConfig content:\n{}", config.to_toml()?);

    std::fs::create_dir_all(Cli::tracks_dir())?;
    println!("Created track directory: {:?}", Cli::tracks_dir());

    Ok(())
}

fn run_config(action: ConfigAction, config: &Config) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("Configuration ({:?}):\n", Config::default_path());
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Get { key } => match lookup_config_value(&config.to_toml()?, &key) {
            Some(v) => println!("{} = {}", key, v),
            None => {
                anyhow::bail!("Configuration key '{}' not found", key);
            }
        },
        ConfigAction::Set { key, value } => {
            let config_path = Config::default_path();
            if !config_path.exists() {
                anyhow::bail!("No config file found. Run 'motion-sense init' first.");
            }

            let content = std::fs::read_to_string(&config_path)?;
            let updated = update_config_value(&content, &key, &value)
                .ok_or_else(|| anyhow::anyhow!("Unknown configuration key '{}'", key))?;

            // Reject edits that would produce an invalid config
            let parsed: Config = toml::from_str(&updated)
                .map_err(|e| anyhow::anyhow!("'{}' is not valid for {}: {}", value, key, e))?;
            parsed.validate()?;

            std::fs::write(&config_path, updated)?;
            println!("Set {} = {}", key, value);
        }
        ConfigAction::Reset { force } => {
            let config_path = Config::default_path();

            if config_path.exists() && !force {
                println!("Config exists at {:?}", config_path);
                println!("Use --force to reset to defaults");
                return Ok(());
            }

            Config::default().save_default()?;
            println!("Configuration reset to defaults at {:?}", config_path);
        }
    }

    Ok(())
}

/// Look up a dotted key ("section.field") in rendered TOML.
fn lookup_config_value(toml_str: &str, key: &str) -> Option<String> {
    let doc: toml::Value = toml::from_str(toml_str).ok()?;
    let mut node = &doc;
    for part in key.split('.') {
        node = node.get(part)?;
    }
    Some(node.to_string())
}

/// Set a dotted key in a TOML document, returning the updated text.
/// Returns None if the key does not exist.
fn update_config_value(toml_str: &str, key: &str, value: &str) -> Option<String> {
    let mut doc: toml::Value = toml::from_str(toml_str).ok()?;

    let parts: Vec<&str> = key.split('.').collect();
    let (leaf, path) = parts.split_last()?;

    let mut node = &mut doc;
    for part in path {
        node = node.get_mut(*part)?;
    }
    let slot = node.get_mut(*leaf)?;

    // Parse the new value with the same type as the existing one
    *slot = match slot {
        toml::Value::Integer(_) => toml::Value::Integer(value.parse().ok()?),
        toml::Value::Float(_) => toml::Value::Float(value.parse().ok()?),
        toml::Value::Boolean(_) => toml::Value::Boolean(value.parse().ok()?),
        _ => toml::Value::String(value.to_string()),
    };

    toml::to_string_pretty(&doc).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_config_value() {
        let toml = Config::default().to_toml().unwrap();
        assert_eq!(
            lookup_config_value(&toml, "stream.buffer_size").as_deref(),
            Some("1024")
        );
        assert!(lookup_config_value(&toml, "stream.nope").is_none());
        assert!(lookup_config_value(&toml, "nope").is_none());
    }

    #[test]
    fn test_update_config_value_float() {
        let toml = Config::default().to_toml().unwrap();
        let updated = update_config_value(&toml, "classifier.decay_secs", "5.5").unwrap();
        let parsed: Config = toml::from_str(&updated).unwrap();
        assert_eq!(parsed.classifier.decay_secs, 5.5);
    }

    #[test]
    fn test_update_config_value_integer() {
        let toml = Config::default().to_toml().unwrap();
        let updated = update_config_value(&toml, "stream.buffer_size", "4096").unwrap();
        let parsed: Config = toml::from_str(&updated).unwrap();
        assert_eq!(parsed.stream.buffer_size, 4096);
    }

    #[test]
    fn test_update_config_value_unknown_key() {
        let toml = Config::default().to_toml().unwrap();
        assert!(update_config_value(&toml, "classifier.bogus", "1").is_none());
    }

    #[test]
    fn test_update_config_value_type_mismatch() {
        let toml = Config::default().to_toml().unwrap();
        assert!(update_config_value(&toml, "stream.buffer_size", "not-a-number").is_none());
    }
}
