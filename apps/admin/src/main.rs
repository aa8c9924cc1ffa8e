mod config;
mod render;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use client_core::{
    AdminController, AdminPolicy, AdminRouteDecision, AppForm, AuthState, ControllerError,
    FormMode, PublicListView, SaveOutcome, StaticAuthGate, SystemClock,
};
use futures::StreamExt;
use shared::{LaunchStatus, RecordId};
use storage::{RecordStore, SqliteRecordStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    config::{load_settings, normalize_database_url, Settings},
    render::{render_row, render_state, Audience},
};

#[derive(Parser, Debug)]
#[command(name = "portfolio-admin", about = "Manage the portfolio app list")]
struct Cli {
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    collection: Option<String>,
    /// Email the command runs as; writes require the admin email.
    #[arg(long = "as")]
    operator_email: Option<String>,
    #[arg(long)]
    admin_email: Option<String>,
    #[arg(long)]
    save_timeout_seconds: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current list, newest first.
    List,
    /// Print the list again on every change until interrupted.
    Watch,
    Add {
        #[command(flatten)]
        fields: FieldArgs,
        #[arg(long)]
        yes: bool,
    },
    Edit {
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
        #[arg(long)]
        yes: bool,
    },
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(ClapArgs, Debug, Default)]
struct FieldArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    tagline: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long, value_enum)]
    status: Option<StatusArg>,
    #[arg(long)]
    launch_date: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    launch_weeks: Option<i64>,
    #[arg(long)]
    link: Option<String>,
}

impl FieldArgs {
    fn apply(self, form: &mut AppForm) {
        if let Some(v) = self.name {
            form.name = v;
        }
        if let Some(v) = self.tagline {
            form.tagline = v;
        }
        if let Some(v) = self.description {
            form.description = v;
        }
        if let Some(v) = self.status {
            form.launch_status = v.into();
        }
        if let Some(v) = self.launch_date {
            form.launch_date = v;
        }
        if let Some(v) = self.launch_weeks {
            form.launch_weeks = Some(v);
        }
        if let Some(v) = self.link {
            form.external_link = v;
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StatusArg {
    ComingSoon,
    ComingOnDate,
    ComingInWeeks,
    Launched,
}

impl From<StatusArg> for LaunchStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::ComingSoon => LaunchStatus::ComingSoon,
            StatusArg::ComingOnDate => LaunchStatus::ComingOnDate,
            StatusArg::ComingInWeeks => LaunchStatus::ComingInWeeks,
            StatusArg::Launched => LaunchStatus::Launched,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = apply_overrides(load_settings()?, &cli);
    let database_url = normalize_database_url(&settings.database_url);
    let store: Arc<dyn RecordStore> = Arc::new(
        SqliteRecordStore::new(&database_url)
            .await
            .context("failed to open record store")?,
    );
    info!(
        "admin cli: store ready url={database_url} collection={}",
        settings.collection
    );

    let policy = AdminPolicy::new(settings.admin_email.clone());
    let auth_state = match settings.operator_email.clone() {
        Some(email) => AuthState::signed_in(email),
        None => AuthState::signed_out(),
    };
    let gate = StaticAuthGate::new(auth_state);
    let audience = if policy.check(&gate) == AdminRouteDecision::Allow {
        Audience::Admin
    } else {
        Audience::Public
    };

    match cli.command {
        Command::List => {
            let view = PublicListView::open(store.as_ref(), &settings.collection).await?;
            println!("{}", render_state(&view.state(), audience));
            view.close();
        }
        Command::Watch => {
            let view = PublicListView::open(store.as_ref(), &settings.collection).await?;
            let mut updates = view.updates();
            loop {
                tokio::select! {
                    state = updates.next() => match state {
                        Some(state) => println!("{}\n", render_state(&state, audience)),
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
        Command::Add { fields, yes } => {
            require_admin(&policy, &gate)?;
            let controller = mounted_controller(store, &settings).await?;
            controller.open_create_form().await?;
            let result = save(&controller, fields, yes).await;
            controller.unmount().await;
            result?;
        }
        Command::Edit { id, fields, yes } => {
            require_admin(&policy, &gate)?;
            let controller = mounted_controller(store, &settings).await?;
            let result = edit(&controller, RecordId::new(id), fields, yes).await;
            controller.unmount().await;
            result?;
        }
        Command::Delete { id, yes } => {
            require_admin(&policy, &gate)?;
            let controller = mounted_controller(store, &settings).await?;
            let result = delete(&controller, RecordId::new(id), yes).await;
            controller.unmount().await;
            result?;
        }
    }

    Ok(())
}

fn apply_overrides(mut settings: Settings, cli: &Cli) -> Settings {
    if let Some(v) = &cli.database_url {
        settings.database_url = v.clone();
    }
    if let Some(v) = &cli.collection {
        settings.collection = v.clone();
    }
    if let Some(v) = &cli.operator_email {
        settings.operator_email = Some(v.clone());
    }
    if let Some(v) = &cli.admin_email {
        settings.admin_email = v.clone();
    }
    if let Some(v) = cli.save_timeout_seconds {
        settings.save_timeout_seconds = v;
    }
    settings
}

fn require_admin(policy: &AdminPolicy, gate: &StaticAuthGate) -> Result<()> {
    match policy.check(gate) {
        AdminRouteDecision::Allow => Ok(()),
        AdminRouteDecision::RedirectToLogin => {
            bail!("sign in first: pass --as <email> or set OPERATOR_EMAIL")
        }
        AdminRouteDecision::RedirectToHome => {
            bail!("only {} may change the app list", policy.admin_email())
        }
        AdminRouteDecision::Loading => bail!("identity is still loading"),
    }
}

async fn mounted_controller(
    store: Arc<dyn RecordStore>,
    settings: &Settings,
) -> Result<Arc<AdminController>> {
    let controller = AdminController::new_with_dependencies(
        store,
        Arc::new(SystemClock),
        settings.admin_options(),
    );
    controller.mount().await.map_err(with_notice)?;
    Ok(controller)
}

async fn save(controller: &AdminController, fields: FieldArgs, yes: bool) -> Result<()> {
    controller.edit_form(|form| fields.apply(form)).await?;
    controller.request_save().await.map_err(with_notice)?;

    let view = controller.view().await;
    if !yes {
        let action = match &view.mode {
            FormMode::Create => "create".to_string(),
            FormMode::Edit(id) => format!("update {id}"),
        };
        println!("Ready to {action} \"{}\". Re-run with --yes to confirm.", view.form.name);
        controller.cancel_save().await?;
        return Ok(());
    }

    println!("{}", client_core::admin::SAVING_STATUS);
    match controller.confirm_save().await.map_err(with_notice)? {
        SaveOutcome::Created(id) => println!("created id={id}"),
        SaveOutcome::Updated(id) => println!("updated id={id}"),
    }
    Ok(())
}

async fn edit(
    controller: &AdminController,
    id: RecordId,
    fields: FieldArgs,
    yes: bool,
) -> Result<()> {
    controller
        .begin_edit_by_id(&id)
        .await
        .map_err(with_notice)?;
    save(controller, fields, yes).await
}

async fn delete(controller: &AdminController, id: RecordId, yes: bool) -> Result<()> {
    let view = controller.view().await;
    let Some(app) = view
        .apps
        .as_ref()
        .and_then(|apps| apps.iter().find(|app| app.id == id))
    else {
        return Err(with_notice(ControllerError::UnknownRecord(id)));
    };

    controller.request_delete(id.clone()).await?;
    if !yes {
        println!("Ready to delete:\n{}\nRe-run with --yes to confirm.", render_row(app));
        controller.cancel_delete().await?;
        return Ok(());
    }

    let deleted = controller.confirm_delete().await.map_err(with_notice)?;
    println!("deleted id={deleted}");
    Ok(())
}

fn with_notice(err: ControllerError) -> anyhow::Error {
    let notice = err.notice();
    anyhow::Error::new(err).context(notice.to_string())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
