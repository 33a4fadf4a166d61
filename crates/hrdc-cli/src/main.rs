use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use hrdc::auth::FileArtifactStore;
use hrdc::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use hrdc_cli::{
    commands::{Command, HELP},
    config::Config,
    logging::init_logging,
    render,
};

type Input = Lines<BufReader<Stdin>>;

enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config.logging);
    tracing::info!(supabase = %config.supabase.url, responder = %config.responder.url, "Starting HRDC console");

    let artifacts = Arc::new(
        FileArtifactStore::new(&config.storage.artifacts_dir)
            .context("Failed to open session storage")?,
    );
    let app = AppBuilder::new()
        .supabase(&config.supabase.url, &config.supabase_anon_key)
        .webhook(config.responder.clone())
        .payment_public_key(&config.paystack_public_key)
        .session_config(config.session.clone())
        .sync_config(config.sync.clone())
        .artifacts(artifacts)
        .build()
        .await?;
    app.start().await;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    println!("HRDC assistant. Type /help for commands.");

    loop {
        if app.session().identity().is_none() && !sign_in(&app, &mut input).await? {
            break;
        }

        let Some(line) = prompt(&mut input, "> ").await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        if let Flow::Quit = run(&app, command).await? {
            break;
        }
    }

    tracing::info!("Console closed");
    Ok(())
}

async fn prompt(input: &mut Input, label: &str) -> anyhow::Result<Option<String>> {
    print!("{}", label);
    std::io::stdout().flush()?;
    Ok(input.next_line().await?)
}

/// Ask for credentials until signed in; `false` when the user gives up
async fn sign_in(app: &App, input: &mut Input) -> anyhow::Result<bool> {
    println!("Sign in (empty email to quit)");
    loop {
        let email = match prompt(input, "email: ").await? {
            Some(email) if !email.trim().is_empty() => email,
            _ => return Ok(false),
        };
        let Some(password) = prompt(input, "password: ").await? else {
            return Ok(false);
        };

        if let Err(e) = app.session().login(&email, &password).await {
            println!("{}", e.user_message());
            continue;
        }

        let mut state = app.session().subscribe();
        let signed_in = tokio::time::timeout(
            Duration::from_secs(5),
            state.wait_for(|s| s.identity.is_some()),
        )
        .await;
        match signed_in {
            Ok(Ok(state)) => {
                if let Some(identity) = &state.identity {
                    println!("Welcome, {}.", identity.display_name());
                }
                return Ok(true);
            }
            _ => println!("Sign-in did not complete. Please try again."),
        }
    }
}

async fn run(app: &App, command: Command) -> anyhow::Result<Flow> {
    match command {
        Command::Say(text) => say(app, &text).await,
        Command::New => match app.chat().create_thread(None).await {
            Ok(thread) => println!("Started \"{}\"", thread.title),
            Err(e) => println!("{}", e.user_message()),
        },
        Command::List => {
            let state = app.chat().state();
            println!("{}", render::thread_list(&state.threads, state.current_thread_id.as_deref()));
        }
        Command::Select(n) => match thread_id_at(app, n) {
            Some(id) => {
                app.chat().select_thread(&id);
                if let Some(thread) = app.chat().current_thread() {
                    println!("-- {} --", thread.title);
                    for message in &thread.messages {
                        println!("{}", render::message(message));
                    }
                }
            }
            None => println!("No conversation {}", n),
        },
        Command::Delete(n) => match thread_id_at(app, n) {
            Some(id) => match app.chat().delete_thread(&id).await {
                Ok(()) => println!("Deleted conversation {}", n),
                Err(e) => println!("{}", e.user_message()),
            },
            None => println!("No conversation {}", n),
        },
        Command::Clear => match app.chat().clear_all().await {
            Ok(()) => println!("All conversations deleted"),
            Err(e) => println!("{}", e.user_message()),
        },
        Command::Usage => match (app.billing(), app.session().identity()) {
            (Some(billing), Some(identity)) => {
                let usage = billing.usage_status(&identity.id).await;
                let subscription = billing.subscription(&identity.id).await;
                println!("{}", render::usage(&usage, &subscription));
            }
            _ => println!("Usage is not metered"),
        },
        Command::Upgrade => upgrade(app).await,
        Command::Verify(reference) => match app.billing() {
            Some(billing) => match billing.verify_payment(&reference).await {
                Ok(outcome) if outcome.success => println!("Payment confirmed. Enjoy unlimited queries."),
                Ok(outcome) => println!(
                    "{}",
                    outcome.message.as_deref().unwrap_or("Payment could not be verified")
                ),
                Err(e) => println!("{}", e.user_message()),
            },
            None => println!("Payments are not configured"),
        },
        Command::Logout => match app.session().logout().await {
            Ok(()) => println!("Signed out"),
            Err(e) => println!("{}", e.user_message()),
        },
        Command::Help => println!("{}", HELP),
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

async fn say(app: &App, text: &str) {
    match app.submit(text).await {
        Ok(reply) => println!("{}", render::message(&reply)),
        Err(AppError::Chat(e)) => {
            tracing::debug!(error = %e, "Send failed");
            // the apology, when one was stored
            match app.chat().current_thread().and_then(|t| t.last_message().cloned()) {
                Some(message) if message.is_error => println!("{}", render::message(&message)),
                _ => println!("{}", e.user_message()),
            }
        }
        Err(e) => println!("{}", e.user_message()),
    }
}

async fn upgrade(app: &App) {
    let (Some(billing), Some(identity)) = (app.billing(), app.session().identity()) else {
        println!("Payments are not configured");
        return;
    };
    match billing.initialize_payment(&identity, PlanType::Standard).await {
        Ok(init) => {
            let config = &init.config;
            println!(
                "Checkout for {} {:.2} created (reference {}).",
                config.currency,
                config.amount as f64 / 100.0,
                config.reference
            );
            println!("Complete the payment, then run /verify {}", config.reference);
        }
        Err(e) => println!("{}", e.user_message()),
    }
}

fn thread_id_at(app: &App, n: usize) -> Option<String> {
    app.chat().threads().get(n - 1).map(|t| t.id.clone())
}
