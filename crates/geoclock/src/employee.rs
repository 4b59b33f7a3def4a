//! Employee commands: status, clock in/out, history, watch

use anyhow::{Context, Result, bail};
use geoclock_api::{ClockState, Coordinate, PositionSample, SessionStatus, TimesheetSession};
use geoclock_core::{ClockEngine, CoreEvent};
use geoclock_position::{
    DEFAULT_REPLAY_ACCURACY_METERS, PositionEvent, PositionProvider, ReplayPositionProvider,
    load_track,
};
use geoclock_store::Store;
use geoclock_util::{format_clock_time, format_date, format_datetime_full, format_worked_duration};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::App;

pub fn status(app: &App) -> Result<()> {
    let engine = app.engine()?;
    let now = geoclock_util::now();
    let status = engine.status(now);

    let profile = app.store.get_profile(&status.user_id)?;
    let name = profile
        .as_ref()
        .map(|p| p.display_name().to_string())
        .unwrap_or_else(|| status.user_id.to_string());

    println!("User:   {}", name);
    if let Some(profile) = &profile {
        println!("View:   {}", profile.role.landing_view());
    }

    match (&status.state, &status.active_session) {
        (ClockState::ClockedIn, Some(session)) => {
            println!(
                "State:  clocked in at {} since {}",
                session_site_name(&*app.store, session),
                format_datetime_full(&session.clock_in_time)
            );
            if let Some(elapsed) = status.elapsed {
                println!("Worked: {}", format_worked_duration(elapsed));
            }
        }
        _ => println!("State:  clocked out"),
    }

    println!("Active sites: {}", engine.sites().len());
    Ok(())
}

pub fn clock_in(
    app: &App,
    position: Option<(f64, f64)>,
    accuracy: Option<f64>,
    manual: bool,
) -> Result<()> {
    let mut engine = app.engine()?;
    let now = geoclock_util::now();

    let location = position
        .map(|(lat, lon)| Coordinate::new(lat, lon))
        .transpose()
        .context("Invalid position")?;

    match (location, manual) {
        (Some(location), false) => {
            let accuracy = accuracy.unwrap_or(DEFAULT_REPLAY_ACCURACY_METERS);
            engine.ingest(PositionEvent::Sample(PositionSample::device(
                location, accuracy, now,
            )));
        }
        (location, true) => {
            let location = location.unwrap_or_else(|| engine.manual_fallback());
            let accuracy = accuracy.unwrap_or(app.settings.location.manual_accuracy_meters);
            engine.use_manual_location(location, accuracy, now);
        }
        (None, false) => bail!("Provide --lat and --lon, or --manual"),
    }

    report_nearest(&engine);

    if let CoreEvent::ClockedIn {
        session,
        site_name,
        distance_meters,
    } = engine.clock_in(now)?
    {
        println!(
            "Clocked in at {} ({:.0}m from site) at {}",
            site_name,
            distance_meters,
            format_clock_time(&session.clock_in_time)
        );
    }
    Ok(())
}

pub fn clock_out(app: &App) -> Result<()> {
    let mut engine = app.engine()?;
    let now = geoclock_util::now();

    match engine.clock_out(now)? {
        Some(CoreEvent::ClockedOut {
            clock_out_time,
            worked,
            ..
        }) => println!(
            "Clocked out at {} after {}",
            format_clock_time(&clock_out_time),
            format_worked_duration(worked)
        ),
        _ => println!("Not clocked in"),
    }
    Ok(())
}

pub fn history(app: &App, limit: usize) -> Result<()> {
    let engine = app.engine()?;
    let sessions = app.store.list_sessions_for_user(engine.user_id())?;
    let site_names: HashMap<_, _> = app
        .store
        .list_sites()?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    if sessions.is_empty() {
        println!("No sessions yet");
        return Ok(());
    }

    let now = geoclock_util::now();
    for session in sessions.iter().take(limit) {
        let site = session
            .site_id
            .as_ref()
            .and_then(|id| site_names.get(id))
            .map(String::as_str)
            .unwrap_or("Unassigned");
        let out = session
            .clock_out_time
            .as_ref()
            .map(format_clock_time)
            .unwrap_or_else(|| "--:--".into());
        let duration = match session.status {
            SessionStatus::ClockedIn => format!("{} (active)", format_worked_duration(session.worked(now))),
            SessionStatus::Completed => format_worked_duration(session.worked(now)),
        };

        println!(
            "{}  {}-{}  {:<10}  {}",
            format_date(&session.clock_in_time),
            format_clock_time(&session.clock_in_time),
            out,
            duration,
            site
        );
    }
    Ok(())
}

/// Replay a track through the engine until it ends or Ctrl-C
pub async fn watch(
    app: &App,
    samples: &Path,
    interval_ms: Option<u64>,
    auto_clock_in: bool,
) -> Result<()> {
    let points = load_track(samples)
        .with_context(|| format!("Failed to load track {:?}", samples))?;
    let interval = interval_ms
        .map(Duration::from_millis)
        .unwrap_or(app.settings.location.replay_interval);

    let mut engine = app.engine()?;
    let provider = ReplayPositionProvider::new(points, interval);
    let mut subscription = provider.watch()?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping position watch");
                break;
            }
            event = subscription.next() => {
                let Some(event) = event else {
                    info!("Track finished");
                    break;
                };

                if let Some(event) = engine.ingest(event) {
                    print_event(&event);
                }

                let now = geoclock_util::now();
                if auto_clock_in && engine.can_clock_in(now) {
                    let event = engine.clock_in(now)?;
                    print_event(&event);
                }
            }
        }
    }

    subscription.stop();

    let state = match engine.state() {
        ClockState::ClockedIn => "clocked in",
        ClockState::ClockedOut => "clocked out",
    };
    println!("Final state: {}", state);
    Ok(())
}

/// Name of the session's site, whether or not it is still active
fn session_site_name(store: &dyn Store, session: &TimesheetSession) -> String {
    session
        .site_id
        .as_ref()
        .and_then(|id| store.get_site(id).ok())
        .map(|site| site.name)
        .unwrap_or_else(|| "Unassigned".into())
}

fn report_nearest(engine: &ClockEngine) {
    match engine.nearest() {
        Some(nearest) => println!(
            "Nearest site: {} ({:.0}m, radius {:.0}m)",
            nearest.site.name, nearest.distance_meters, nearest.site.radius_meters
        ),
        None => println!("Nearest site: none"),
    }
}

fn print_event(event: &CoreEvent) {
    match event {
        CoreEvent::NearestSiteChanged { nearest: Some(n) } => println!(
            "{} {:.0}m (radius {:.0}m){}",
            n.site.name,
            n.distance_meters,
            n.site.radius_meters,
            if n.is_within_range() { " in range" } else { "" }
        ),
        CoreEvent::NearestSiteChanged { nearest: None } => println!("No active site nearby"),
        CoreEvent::PositionLost { error } => {
            println!("Location lost: {} (use `clock-in --manual` to continue)", error)
        }
        CoreEvent::ClockedIn {
            site_name,
            distance_meters,
            ..
        } => println!("Clocked in at {} ({:.0}m from site)", site_name, distance_meters),
        CoreEvent::ClockedOut { worked, .. } => {
            println!("Clocked out after {}", format_worked_duration(*worked))
        }
    }
}
