//! Admin commands: sites, employees, attendance log, audit, export

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use geoclock_api::{Coordinate, DEFAULT_RADIUS_METERS, NewJobSite, Profile, UserRole};
use geoclock_core::write_attendance_csv;
use geoclock_store::{AuditEvent, AuditEventType, AuthProvider, Store};
use geoclock_util::{
    SiteId, UserId, format_clock_time, format_date, format_datetime_full, format_worked_duration,
};
use std::path::Path;
use tracing::{info, warn};

use crate::App;

#[derive(Subcommand, Debug)]
pub enum SitesCommand {
    /// List every site, newest first
    List,

    /// Create a site
    Add {
        name: String,

        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Geofence radius in meters (default 100)
        #[arg(long)]
        radius: Option<f64>,
    },

    /// Change a site's name, location, or radius
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        #[arg(long)]
        radius: Option<f64>,
    },

    /// Make a site available for clock-in
    Activate { id: String },

    /// Hide a site from employees
    Deactivate { id: String },

    /// Delete a site; its timesheets are kept without a site
    Remove { id: String },

    /// Import the sites declared in the config file
    Sync,
}

#[derive(Subcommand, Debug)]
pub enum EmployeesCommand {
    /// List profiles by name
    List {
        /// Filter by name or email
        #[arg(long)]
        search: Option<String>,
    },

    /// Create or update a profile
    Add {
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: Option<String>,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },
}

/// Admin commands need an admin profile, except while none exists so the
/// first one can be created
fn require_admin(app: &App) -> Result<UserId> {
    let Some(user_id) = app.auth.current_user_id() else {
        bail!("Not signed in: pass --user or set GEOCLOCK_USER");
    };

    match app.store.get_profile(&user_id)? {
        Some(profile) if profile.role == UserRole::Admin => Ok(user_id),
        _ => {
            let any_admin = app
                .store
                .list_profiles(None)?
                .iter()
                .any(|p| p.role == UserRole::Admin);
            if any_admin {
                bail!("{} is not an administrator", user_id);
            }
            warn!(user_id = %user_id, "No administrators yet, allowing admin command");
            Ok(user_id)
        }
    }
}

fn audit(store: &dyn Store, event: AuditEventType) {
    if let Err(e) = store.append_audit(AuditEvent::new(event)) {
        warn!(error = %e, "Failed to write audit event");
    }
}

pub fn sites(app: &App, cmd: SitesCommand) -> Result<()> {
    require_admin(app)?;
    let store = app.store.as_ref();

    match cmd {
        SitesCommand::List => {
            let sites = store.list_sites()?;
            if sites.is_empty() {
                println!("No job sites");
            }
            for site in sites {
                println!(
                    "{}  {}  [{}]  r={:.0}m{}",
                    site.id,
                    site.name,
                    site.location,
                    site.radius_meters,
                    if site.is_active { "" } else { "  (inactive)" }
                );
            }
        }
        SitesCommand::Add {
            name,
            lat,
            lon,
            radius,
        } => {
            let location = Coordinate::new(lat, lon).context("Invalid site location")?;
            let site = store.create_site(
                &NewJobSite::new(name, location).with_radius(radius.unwrap_or(DEFAULT_RADIUS_METERS)),
            )?;
            audit(
                store,
                AuditEventType::SiteCreated {
                    site_id: site.id.clone(),
                    name: site.name.clone(),
                },
            );
            println!("Created site {} ({})", site.name, site.id);
        }
        SitesCommand::Edit {
            id,
            name,
            lat,
            lon,
            radius,
        } => {
            let id = SiteId::new(id);
            let current = store.get_site(&id)?;

            let location = match lat.zip(lon) {
                Some((lat, lon)) => Coordinate::new(lat, lon).context("Invalid site location")?,
                None => current.location,
            };
            let edit = NewJobSite::new(name.unwrap_or(current.name), location)
                .with_radius(radius.unwrap_or(current.radius_meters));

            let site = store.update_site(&id, &edit)?;
            audit(
                store,
                AuditEventType::SiteUpdated {
                    site_id: site.id.clone(),
                    name: site.name.clone(),
                },
            );
            println!("Updated site {} ({})", site.name, site.id);
        }
        SitesCommand::Activate { id } => set_active(store, SiteId::new(id), true)?,
        SitesCommand::Deactivate { id } => set_active(store, SiteId::new(id), false)?,
        SitesCommand::Remove { id } => {
            let id = SiteId::new(id);
            store.delete_site(&id)?;
            audit(store, AuditEventType::SiteDeleted { site_id: id.clone() });
            println!("Removed site {}", id);
        }
        SitesCommand::Sync => {
            let now = geoclock_util::now();
            for seed in &app.settings.sites {
                store
                    .upsert_site(&seed.to_job_site(now))
                    .with_context(|| format!("Failed to sync site {}", seed.id))?;
                audit(
                    store,
                    AuditEventType::SiteUpdated {
                        site_id: seed.id.clone(),
                        name: seed.site.name.clone(),
                    },
                );
            }
            info!(count = app.settings.sites.len(), "Sites synced from config");
            println!("Synced {} site(s) from config", app.settings.sites.len());
        }
    }
    Ok(())
}

fn set_active(store: &dyn Store, id: SiteId, active: bool) -> Result<()> {
    store.set_site_active(&id, active)?;
    let site = store.get_site(&id)?;
    audit(
        store,
        AuditEventType::SiteUpdated {
            site_id: id,
            name: site.name.clone(),
        },
    );
    println!(
        "{} site {}",
        if active { "Activated" } else { "Deactivated" },
        site.name
    );
    Ok(())
}

pub fn employees(app: &App, cmd: EmployeesCommand) -> Result<()> {
    require_admin(app)?;
    let store = app.store.as_ref();

    match cmd {
        EmployeesCommand::List { search } => {
            let profiles = store.list_profiles(search.as_deref())?;
            if profiles.is_empty() {
                println!("No employees found");
            }
            for profile in profiles {
                println!(
                    "{}  {}  {}  {}",
                    profile.id,
                    profile.display_name(),
                    profile.email.as_deref().unwrap_or("-"),
                    profile.role.as_str()
                );
            }
        }
        EmployeesCommand::Add {
            id,
            name,
            email,
            admin,
        } => {
            let role = if admin {
                UserRole::Admin
            } else {
                UserRole::Employee
            };
            let profile = Profile {
                id: UserId::new(id),
                email,
                full_name: Some(name),
                role,
                created_at: geoclock_util::now(),
            };
            store.upsert_profile(&profile)?;
            audit(
                store,
                AuditEventType::ProfileUpdated {
                    user_id: profile.id.clone(),
                    role,
                },
            );
            println!("Saved {} ({})", profile.display_name(), role.as_str());
        }
    }
    Ok(())
}

pub fn logs(app: &App, limit: usize) -> Result<()> {
    require_admin(app)?;
    let entries = app.store.list_attendance()?;
    if entries.is_empty() {
        println!("No attendance records");
    }

    let now = geoclock_util::now();
    for entry in entries.iter().take(limit) {
        let session = &entry.session;
        let out = session
            .clock_out_time
            .as_ref()
            .map(format_clock_time)
            .unwrap_or_else(|| "active".into());
        println!(
            "{}  {}-{}  {:<8}  {}  @ {}",
            format_date(&session.clock_in_time),
            format_clock_time(&session.clock_in_time),
            out,
            format_worked_duration(session.worked(now)),
            entry.employee_name.as_deref().unwrap_or("Unknown"),
            entry.site_name.as_deref().unwrap_or("Unassigned"),
        );
    }
    Ok(())
}

pub fn audit_log(app: &App, limit: usize) -> Result<()> {
    require_admin(app)?;
    for event in app.store.get_recent_audits(limit)? {
        println!(
            "{}  {:<18} {:?}",
            format_datetime_full(&event.timestamp),
            event.event.kind(),
            event.event
        );
    }
    Ok(())
}

pub fn export(app: &App, output: Option<&Path>) -> Result<()> {
    require_admin(app)?;
    let entries = app.store.list_attendance()?;

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {:?}", path))?;
            write_attendance_csv(file, &entries)?;
            info!(path = %path.display(), rows = entries.len(), "Attendance exported");
        }
        None => write_attendance_csv(std::io::stdout().lock(), &entries)?,
    }
    Ok(())
}
