//! JUnit XML rendering of a launch.
//!
//! One `<testcase>` per service. Failed services carry a `<failure>` whose
//! `type` is the error kind; services after the failure are `<skipped>`.

use std::fmt::Write as _;

use crate::lifecycle::{LaunchReport, StepReport, StepStatus};

/// Render the report as a JUnit document.
pub fn render(report: &LaunchReport, suite_name: &str) -> String {
    let tests = report.steps.len();
    let failures = count(report, |s| matches!(s, StepStatus::Failed { .. }));
    let skipped = count(report, |s| matches!(s, StepStatus::Skipped));
    let time = report.elapsed.as_secs_f64();

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        xml,
        "<testsuites name=\"{}\" tests=\"{}\" failures=\"{}\" skipped=\"{}\" time=\"{:.3}\">",
        escape(suite_name),
        tests,
        failures,
        skipped,
        time
    );
    let _ = writeln!(
        xml,
        "  <testsuite name=\"{}\" id=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"0\" skipped=\"{}\" time=\"{:.3}\">",
        escape(suite_name),
        report.run_id,
        tests,
        failures,
        skipped,
        time
    );
    xml.push_str("    <properties>\n");
    let _ = writeln!(xml, "      <property name=\"run_id\" value=\"{}\"/>", report.run_id);
    let _ = writeln!(xml, "      <property name=\"exit_code\" value=\"{}\"/>", report.exit_code());
    xml.push_str("    </properties>\n");

    for step in &report.steps {
        render_step(&mut xml, suite_name, step);
    }

    xml.push_str("  </testsuite>\n");
    xml.push_str("</testsuites>\n");
    xml
}

fn render_step(xml: &mut String, suite_name: &str, step: &StepReport) {
    let _ = write!(
        xml,
        "    <testcase classname=\"{}.{}\" name=\"{}\" time=\"{:.3}\"",
        escape(suite_name),
        escape(&step.service),
        escape(&step.service),
        step.elapsed.as_secs_f64()
    );

    match &step.status {
        StepStatus::Skipped => {
            xml.push_str(">\n      <skipped message=\"not attempted after an earlier failure\"/>\n");
        }
        StepStatus::Failed { kind, message } => {
            let _ = writeln!(
                xml,
                ">\n      <failure type=\"{}\" message=\"{}\">{}</failure>",
                escape(kind),
                escape(message),
                escape(message)
            );
            render_output(xml, step);
        }
        StepStatus::Completed => {
            xml.push_str(">\n");
            render_output(xml, step);
        }
    }

    xml.push_str("    </testcase>\n");
}

fn render_output(xml: &mut String, step: &StepReport) {
    let mut out = format!("probe attempts: {}\n", step.attempts);
    for command in &step.commands {
        let code = command
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string());
        let _ = write!(out, "[{}] {} -> exit {}", command.phase, command.command, code);
        if let Some(error) = &command.error {
            let _ = write!(out, " ({})", error);
        }
        out.push('\n');
    }
    let _ = writeln!(xml, "      <system-out>{}</system-out>", escape(&out));
}

fn count(report: &LaunchReport, pred: impl Fn(&StepStatus) -> bool) -> usize {
    report.steps.iter().filter(|s| pred(&s.status)).count()
}

/// Escape text for use in XML attributes and content.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Not representable in XML 1.0.
            c if (c as u32) < 0x20 && !matches!(c, '\n' | '\r' | '\t') => {}
            c => out.push(c),
        }
    }
    out
}
