//! Telemetry Sender
//!
//! Generates random patient telemetry records and posts them to the
//! ingestion service for end-to-end testing.
//!
//! Usage: telemetry_sender [base_url] [count] [high_risk_rate] [delay_ms]

use heart_failure_ingest::types::HeartData;
use rand::Rng;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

/// Patient record generator for testing
struct PatientGenerator {
    rng: rand::rngs::ThreadRng,
}

impl PatientGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a patient with values in typical ranges
    fn generate_typical(&mut self) -> HeartData {
        HeartData {
            age: f64::from(self.rng.gen_range(40..80_i32)),
            anaemia: i64::from(self.rng.gen_bool(0.4)),
            creatinine_phosphokinase: self.rng.gen_range(50..800),
            diabetes: i64::from(self.rng.gen_bool(0.4)),
            ejection_fraction: self.rng.gen_range(30..60),
            high_blood_pressure: i64::from(self.rng.gen_bool(0.35)),
            platelets: self.rng.gen_range(150_000.0..400_000.0_f64).round(),
            serum_creatinine: (self.rng.gen_range(0.6..1.5_f64) * 100.0).round() / 100.0,
            serum_sodium: self.rng.gen_range(134..145),
            sex: i64::from(self.rng.gen_bool(0.65)),
            smoking: i64::from(self.rng.gen_bool(0.3)),
            time: self.rng.gen_range(60..280),
            death_event: None,
        }
    }

    /// Generate a patient with markers associated with a death event
    fn generate_high_risk(&mut self) -> HeartData {
        HeartData {
            age: f64::from(self.rng.gen_range(65..95_i32)),
            ejection_fraction: self.rng.gen_range(14..30), // Low ejection fraction
            serum_creatinine: (self.rng.gen_range(1.8..6.0_f64) * 100.0).round() / 100.0,
            serum_sodium: self.rng.gen_range(113..132), // Hyponatremia
            time: self.rng.gen_range(4..60),            // Short follow-up
            ..self.generate_typical()
        }
    }
}

/// High-risk share as a probability; out-of-range values are clamped to [0, 1]
fn parse_rate(arg: Option<&str>) -> f64 {
    match arg.and_then(|s| s.parse::<f64>().ok()) {
        Some(rate) if rate.is_nan() => 0.3,
        Some(rate) => rate.clamp(0.0, 1.0),
        None => 0.3,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("telemetry_sender=info".parse()?),
        )
        .init();

    info!("Starting Telemetry Sender");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/'))
        .unwrap_or("http://localhost:8000");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);
    let high_risk_rate = parse_rate(args.get(3).map(String::as_str));
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(200);

    info!(
        base_url = %base_url,
        count = count,
        high_risk_rate = high_risk_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    // Check the service is reachable
    match client.get(format!("{}/health", base_url)).send().await {
        Ok(response) if response.status().is_success() => info!("Service is reachable"),
        Ok(response) => {
            warn!(status = %response.status(), "Health check failed. Running in dry-run mode.");
            return run_dry_mode(count, high_risk_rate, delay_ms).await;
        }
        Err(e) => {
            warn!(error = %e, "Service unreachable. Running in dry-run mode.");
            return run_dry_mode(count, high_risk_rate, delay_ms).await;
        }
    }

    let mut generator = PatientGenerator::new();
    let mut rng = rand::thread_rng();
    let endpoint = format!("{}/ingest/telemetry", base_url);

    let mut predicted_high = 0;
    let mut predicted_low = 0;
    let mut failed = 0;

    for i in 0..count {
        let record = if rng.gen_bool(high_risk_rate) {
            generator.generate_high_risk()
        } else {
            generator.generate_typical()
        };

        match client.post(&endpoint).json(&record).send().await {
            Ok(response) if response.status().is_success() => {
                let body: Value = response.json().await?;
                match body.get("DEATH_EVENT").and_then(Value::as_i64) {
                    Some(1) => predicted_high += 1,
                    _ => predicted_low += 1,
                }
            }
            Ok(response) => {
                failed += 1;
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!(status = %status, body = %body, "Record rejected");
            }
            Err(e) => {
                failed += 1;
                error!(error = %e, "Failed to send record");
            }
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} records ({} high risk, {} low risk, {} failed)",
                i + 1,
                count,
                predicted_high,
                predicted_low,
                failed
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} records ({} high risk, {} low risk, {} failed)",
        count, predicted_high, predicted_low, failed
    );

    Ok(())
}

async fn run_dry_mode(count: u64, high_risk_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no service connection)");

    let mut generator = PatientGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let record = if rng.gen_bool(high_risk_rate) {
            generator.generate_high_risk()
        } else {
            generator.generate_typical()
        };

        let json = serde_json::to_string_pretty(&record)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample record {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_is_clamped_to_probability() {
        assert_eq!(parse_rate(Some("1.5")), 1.0);
        assert_eq!(parse_rate(Some("-0.2")), 0.0);
        assert_eq!(parse_rate(Some("0.25")), 0.25);
        assert_eq!(parse_rate(Some("NaN")), 0.3);
        assert_eq!(parse_rate(Some("lots")), 0.3);
        assert_eq!(parse_rate(None), 0.3);
    }

    #[test]
    fn test_high_risk_patient_has_low_ejection_fraction() {
        let mut generator = PatientGenerator::new();
        let record = generator.generate_high_risk();
        assert!(record.ejection_fraction < 30);
        assert!(record.death_event.is_none());
    }
}
