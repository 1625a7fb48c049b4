//! Window command
//!
//! Shows the period window that contains an instant.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use streak_core::{PeriodKind, PeriodWindow};
use tabled::Tabled;

use super::helpers::{format_instant, parse_at};
use super::Context;
use crate::output::print_single;

#[derive(Args)]
pub struct WindowArgs {
    /// Period kind (day, week, fortnight, month, year)
    pub period: PeriodKind,

    /// Reference instant, defaults to now
    #[arg(long)]
    pub at: Option<String>,
}

/// Window row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct WindowRow {
    #[tabled(rename = "Period")]
    pub period: String,
    #[tabled(rename = "Start")]
    pub start: String,
    #[tabled(rename = "End")]
    pub end: String,
}

impl WindowRow {
    fn new(period: PeriodKind, window: PeriodWindow) -> Self {
        Self {
            period: period.to_string(),
            start: format_instant(window.start),
            end: format_instant(window.end),
        }
    }
}

pub async fn execute(ctx: &Context, args: WindowArgs) -> Result<()> {
    let reference = parse_at(args.at.as_deref())?;
    let window = args.period.resolve(reference);

    print_single(&WindowRow::new(args.period, window), ctx.format)?;

    Ok(())
}
