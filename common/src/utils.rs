pub fn secs_to_human(duration: i64) -> String {
    let secs = duration % 60;
    let mins = duration / 60;
    let hours = mins / 60;
    let mins = mins % 60;

    let mut out = Vec::new();
    if hours > 0 {
        out.push(format!("{:2}h", hours));
    }
    if mins > 0 || hours > 0 {
        out.push(format!("{:2}m", mins));
    }
    out.push(format!("{:2}s", secs));

    out.join(" ")
}

/// Renders the time left on a lease, `remaining` may be negative once the
/// lease has run out.
pub fn lease_to_human(remaining: i64) -> String {
    if remaining <= 0 {
        format!("expired {} ago", secs_to_human(-remaining).trim_start())
    } else {
        format!("{} left", secs_to_human(remaining).trim_start())
    }
}
