use chrono::Utc;
use luna::{present, DisplayFields, DisplaySink, JulianDate, MemorySettings, MoonIndicator, MoonSnapshot};
use std::sync::Arc;
use std::time::Duration;

struct StdoutSink;

impl DisplaySink for StdoutSink {
    fn publish(&self, fields: &DisplayFields) {
        println!(
            "{} ({}) next: {} | {} | age {} | icon {}",
            fields.phase_label,
            fields.illumination_label,
            fields.next_phase_label,
            fields.distance_label,
            fields.age_label,
            fields.icon_key,
        );
    }

    fn notice(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

#[tokio::main]
async fn main() -> luna::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("luna=debug")),
        )
        .init();

    let now = Utc::now();
    let snapshot = MoonSnapshot::at(&now);
    println!("{}", JulianDate::from_datetime(&now));
    println!("{snapshot:?}");
    println!("{:?}", present(&snapshot));

    let settings = MemorySettings::from_toml_str(
        r#"
        update-interval = 900
        data-source = "local"
        hemisphere = "southern"
        "#,
    )?;
    let mut indicator = MoonIndicator::start(Arc::new(settings), Arc::new(StdoutSink));
    tokio::time::sleep(Duration::from_millis(50)).await;

    println!("manual refresh: {:?}", indicator.refresh_now());
    tokio::time::sleep(Duration::from_millis(50)).await;

    indicator.shutdown();
    Ok(())
}
