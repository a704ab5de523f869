use anyhow::Result;
use colored::Colorize;
use ringside_game::BatchSummary;
use std::io::Write;
use std::time::Duration;

use super::simulation::{ModeReport, SimulationReport};

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn rtp_status(summary: &BatchSummary, tolerance: f64) -> colored::ColoredString {
    let deviation = pct(summary.rtp_deviation);
    if summary.rtp_deviation.abs() <= tolerance {
        deviation.green()
    } else {
        deviation.red()
    }
}

pub fn generate_console_report(
    writer: &mut impl Write,
    report: &SimulationReport,
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Simulation Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "=====================".cyan())?;
    writeln!(
        writer,
        "Trials per batch: {}  Seeds: {:?}",
        report.trials, report.seeds
    )?;
    writeln!(writer, "Generated at: {}", report.generated_at)?;
    writeln!(writer, "Elapsed: {total_duration:?}")?;
    writeln!(writer)?;

    for mode in &report.modes {
        write_console_mode(writer, mode)?;
    }

    if let Some(pools) = &report.pools {
        writeln!(writer, "{}", "🎰 Pool Composition".bright_yellow().bold())?;
        writeln!(writer, "{}", "===================".yellow())?;
        for pool in pools {
            writeln!(writer, "{} ({} symbols)", pool.mode.bold(), pool.profile.total)?;
            for (class, share) in &pool.profile.classes {
                writeln!(
                    writer,
                    "   {class:?}: {} ({})",
                    share.count,
                    pct(share.share)
                )?;
            }
        }
        writeln!(writer)?;
    }

    if let Some(tuning) = &report.tuning {
        writeln!(writer, "{}", "🔧 Tuning Recommendations".bright_magenta().bold())?;
        writeln!(writer, "{}", "=========================".magenta())?;
        for rec in &tuning.recommendations {
            writeln!(
                writer,
                "{}: measured {:.4} vs target {:.4} -> adjustment {:.4} (was {:.4})",
                rec.mode.bold(),
                rec.measured_rtp,
                rec.target_rtp,
                rec.recommended_adjustment,
                rec.current_adjustment
            )?;
        }
        if let Some(scale) = tuning.uniform_scale {
            writeln!(writer, "Uniform paytable scale: {scale:.4}")?;
        }
    }
    Ok(())
}

fn write_console_mode(writer: &mut impl Write, mode: &ModeReport) -> Result<()> {
    let summary = &mode.summary;
    writeln!(
        writer,
        "{} seed {} ({} trials)",
        summary.mode.bold(),
        summary.seed,
        summary.trials
    )?;
    writeln!(
        writer,
        "   RTP: {} (target {}, deviation {})",
        pct(summary.rtp),
        pct(summary.rtp_target),
        rtp_status(summary, 0.01)
    )?;
    writeln!(
        writer,
        "   Hit rate: {} (target {})",
        pct(summary.hit_rate),
        pct(summary.hit_rate_target)
    )?;
    writeln!(
        writer,
        "   Average win: {:.4}x  Max win: {:.4}x / cap {:.1}x",
        summary.average_win, summary.max_win, summary.max_win_cap
    )?;
    writeln!(
        writer,
        "   Cap hits: {}  Mean attempts: {:.3}  Exhausted: {}",
        summary.cap_hits,
        summary.mean_attempts,
        if summary.exhausted == 0 {
            summary.exhausted.to_string().green()
        } else {
            summary.exhausted.to_string().red()
        }
    )?;
    let endings: Vec<String> = summary
        .terminations
        .iter()
        .map(|(reason, count)| format!("{reason}={count}"))
        .collect();
    writeln!(writer, "   Endings: {}", endings.join(", "))?;
    writeln!(writer, "   Paytable: {}", summary.paytable_fingerprint)?;
    writeln!(writer, "   Distribution:")?;
    for bucket in &summary.histogram {
        writeln!(writer, "     {:>10}: {}", bucket.label, bucket.count)?;
    }
    if mode.categories.len() > 1 {
        writeln!(writer, "   Categories:")?;
        for category in &mode.categories {
            writeln!(
                writer,
                "     • {} [{}..{}] rtp {} hit {} attempts {:.3}",
                category.category,
                category.offset,
                category.offset + category.trials,
                pct(category.rtp),
                pct(category.hit_rate),
                category.mean_attempts
            )?;
        }
    }
    if !mode.sample_trials.is_empty() {
        writeln!(writer, "   Sample trials:")?;
        for sample in &mode.sample_trials {
            let record = &sample.record;
            writeln!(
                writer,
                "     {} -> {:.4}x ({}, {} attempt(s))",
                record.rendered_symbols(),
                record.final_win,
                record.termination,
                sample.attempts
            )?;
        }
    }
    writeln!(writer)?;
    Ok(())
}

pub fn generate_json_report(writer: &mut impl Write, report: &SimulationReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writeln!(writer)?;
    Ok(())
}

pub fn generate_markdown_report(writer: &mut impl Write, report: &SimulationReport) -> Result<()> {
    writeln!(writer, "# Ringside Simulation Results\n")?;
    writeln!(writer, "- **Generated**: {}", report.generated_at)?;
    writeln!(writer, "- **Trials per batch**: {}", report.trials)?;
    writeln!(writer, "- **Seeds**: {:?}\n", report.seeds)?;

    writeln!(writer, "## Summary\n")?;
    writeln!(
        writer,
        "| Mode | Seed | Trials | RTP | Target | Hit rate | Avg win | Max win | Cap hits | Exhausted |"
    )?;
    writeln!(writer, "|---|---|---|---|---|---|---|---|---|---|")?;
    for mode in &report.modes {
        let s = &mode.summary;
        writeln!(
            writer,
            "| {} | {} | {} | {} | {} | {} | {:.4} | {:.4} | {} | {} |",
            s.mode,
            s.seed,
            s.trials,
            pct(s.rtp),
            pct(s.rtp_target),
            pct(s.hit_rate),
            s.average_win,
            s.max_win,
            s.cap_hits,
            s.exhausted
        )?;
    }
    writeln!(writer)?;

    writeln!(writer, "## Win Distribution\n")?;
    for mode in &report.modes {
        writeln!(writer, "### {} (seed {})\n", mode.summary.mode, mode.summary.seed)?;
        for bucket in &mode.summary.histogram {
            writeln!(writer, "- **{}**: {}", bucket.label, bucket.count)?;
        }
        writeln!(writer)?;
    }

    if let Some(tuning) = &report.tuning {
        writeln!(writer, "## Tuning\n")?;
        for rec in &tuning.recommendations {
            writeln!(
                writer,
                "- **{}**: adjustment {:.4} -> {:.4}",
                rec.mode, rec.current_adjustment, rec.recommended_adjustment
            )?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

pub fn generate_csv_report(writer: &mut impl Write, report: &SimulationReport) -> Result<()> {
    writeln!(
        writer,
        "mode,seed,trials,rtp,rtp_target,hit_rate,average_win,max_win,cap_hits,exhausted,mean_attempts,paytable"
    )?;
    for mode in &report.modes {
        let s = &mode.summary;
        writeln!(
            writer,
            "{},{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{},{},{:.4},{}",
            s.mode,
            s.seed,
            s.trials,
            s.rtp,
            s.rtp_target,
            s.hit_rate,
            s.average_win,
            s.max_win,
            s.cap_hits,
            s.exhausted,
            s.mean_attempts,
            s.paytable_fingerprint
        )?;
    }
    Ok(())
}
