use movequote_core::config::{AppConfig, LoadOptions};
use movequote_rates::RateSourceChain;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_bot_token(&config));
            checks.push(check_rate_sources(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["bot_token_readiness", "rate_sources"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks
        .iter()
        .any(|check| matches!(check.status, CheckStatus::Fail | CheckStatus::Skipped));
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// A missing token is a warning: pricing and the console chat still work without one.
fn check_bot_token(config: &AppConfig) -> DoctorCheck {
    if config.has_bot_token() {
        DoctorCheck {
            name: "bot_token_readiness",
            status: CheckStatus::Pass,
            details: "bot token present".to_string(),
        }
    } else {
        DoctorCheck {
            name: "bot_token_readiness",
            status: CheckStatus::Warn,
            details: "no bot token configured; the chat transport stays disabled".to_string(),
        }
    }
}

fn check_rate_sources(config: &AppConfig) -> DoctorCheck {
    let chain = match RateSourceChain::from_config(&config.rates) {
        Ok(chain) => chain,
        Err(error) => {
            return DoctorCheck { name: "rate_sources", status: CheckStatus::Fail, details: error.to_string() }
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "rate_sources",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let configured = chain.source_names().join(" -> ");
    match runtime.block_on(chain.fetch()) {
        Ok((table, source)) if source == chain.source_names().first().copied().unwrap_or_default() => {
            DoctorCheck {
                name: "rate_sources",
                status: CheckStatus::Pass,
                details: format!("loaded {} groups from `{source}` ({configured})", table.groups().count()),
            }
        }
        Ok((_, source)) => DoctorCheck {
            name: "rate_sources",
            status: CheckStatus::Warn,
            details: format!("primary source failed, fell back to `{source}` ({configured})"),
        },
        Err(error) => {
            DoctorCheck { name: "rate_sources", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
