//! Demo binary exercising every container.
//!
//! ```bash
//! COMPOSABLE_STATE_STORAGE_DIR=/tmp/composable-state \
//! COMPOSABLE_STATE_TIMER_INTERVAL_MS=200 \
//!   cargo run --bin composable-state-demo
//! ```

use anyhow::Context;
use composable_state_containers::counter::CounterOptions;
use composable_state_containers::forms::rules;
use composable_state_containers::todos::{Priority, TodoPatch};
use composable_state_containers::{Counter, CounterStore, DemoConfig, Form, Timer, TodoList};
use composable_state_core::environment::SystemClock;
use composable_state_core::storage::KeyValueStore;
use composable_state_runtime::{FileStore, InMemoryStore};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "composable_state=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DemoConfig::from_env().context("invalid demo configuration")?;
    tracing::info!(?config, "Starting demo");

    counter_demo().await?;
    counter_store_demo().await?;
    timer_demo(&config).await?;
    todos_demo(&config).await?;
    form_demo().await?;

    Ok(())
}

async fn counter_demo() -> anyhow::Result<()> {
    println!("=== Counter ===");
    let counter = Counter::new(&CounterOptions::new().with_min(0).with_max(10).with_step(3));

    for _ in 0..4 {
        counter.increment().await?;
        let state = counter.snapshot().await;
        println!(
            "value={} doubled={} at_max={}",
            state.value(),
            state.doubled(),
            state.is_at_max()
        );
    }

    counter.set(-5).await?;
    println!("after set(-5): {}", counter.value().await);
    counter.reset().await?;
    println!("after reset: {}\n", counter.value().await);
    Ok(())
}

async fn counter_store_demo() -> anyhow::Result<()> {
    println!("=== Counter store ===");
    let store = CounterStore::new();
    let shared = store.clone();

    store.increment().await?;
    shared.increment().await?;
    shared.set_multiplier(5).await?;

    let state = store.snapshot().await;
    println!(
        "count={} double={} multiplied={}\n",
        state.count,
        state.double_count(),
        state.multiplied_count()
    );
    Ok(())
}

async fn timer_demo(config: &DemoConfig) -> anyhow::Result<()> {
    println!("=== Timer ===");
    let interval = config.timer_options().interval();

    let stopwatch = Timer::new(config.timer_options().with_auto_start(true)).await?;
    tokio::time::sleep(interval * 3 + interval / 2).await;
    stopwatch.pause().await?;
    println!("stopwatch: {}", stopwatch.formatted_time().await);

    let mut countdown_options = config.timer_options();
    countdown_options.countdown = true;
    countdown_options.initial = 2;
    let countdown = Timer::new(countdown_options).await?;
    countdown.toggle().await?;
    tokio::time::sleep(interval * 3).await;
    println!(
        "countdown: {} running={}\n",
        countdown.formatted_time().await,
        countdown.is_running().await
    );

    stopwatch.close().await?;
    countdown.close().await?;
    Ok(())
}

async fn todos_demo(config: &DemoConfig) -> anyhow::Result<()> {
    println!("=== Todos ===");
    let storage: Arc<dyn KeyValueStore> = match &config.storage_dir {
        Some(dir) => Arc::new(
            FileStore::open(dir)
                .with_context(|| format!("cannot open storage directory {}", dir.display()))?,
        ),
        None => Arc::new(InMemoryStore::new()),
    };

    let todos = TodoList::new(config.todo_options(), Arc::new(SystemClock), Some(storage));
    todos.add("Write the report", Priority::High, ["work"]).await?;
    todos.add("Buy groceries", Priority::Low, ["home", "errand"]).await?;
    todos.add("Call the bank", Priority::Medium, ["errand"]).await?;

    let first = todos.with_state(|state| state.todos().first().map(|todo| todo.id)).await;
    if let Some(id) = first {
        todos.toggle(id).await?;
        todos
            .update(id, TodoPatch::new().text("Write the quarterly report"))
            .await?;
    }

    let (total, percentage, tags) = todos
        .with_state(|state| (state.total(), state.completion_percentage(), state.all_tags()))
        .await;
    println!("total={total} done={percentage}% tags={tags:?}");

    let errands = todos
        .with_state(|state| state.by_tag("errand").len())
        .await;
    println!("errands={errands}\n");
    Ok(())
}

async fn form_demo() -> anyhow::Result<()> {
    println!("=== Form ===");
    let form = Form::new([
        ("name", json!("")),
        ("email", json!("")),
        ("address", json!({ "city": "", "zip": "" })),
    ]);

    form.set_rule("name", rules::min_length(2)).await?;
    form.set_rule("email", rules::required()).await?;

    form.set_value("name", json!("A")).await?;
    println!("name error: {:?}", form.error("name").await);

    let valid = form.validate_all().await?;
    println!("valid={valid} errors={:?}", form.errors().await);

    form.set_value("name", json!("Ada")).await?;
    form.set_value("email", json!("ada@example.com")).await?;
    form.set_value_at("address", "/city", json!("London")).await?;
    println!(
        "valid={} address={:?}",
        form.validate_all().await?,
        form.value("address").await
    );

    form.reset().await?;
    println!("after reset touched(name)={}", form.is_touched("name").await);
    Ok(())
}
