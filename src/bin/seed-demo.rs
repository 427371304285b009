//! Demo family seed script
//!
//! Creates one parent with two children:
//! - Parent "Loving Mama" owning 5 tasks and 2 prizes
//! - "Cheeky Boy" saving for Lego (Vacuuming, Laundry, Making Bed)
//! - "Princess Girl" saving for Barbie (Washing dishes, Brushing teeth)
//!
//! Usage:
//!   DATABASE_URL=... ./seed-demo [--password Password1!] [--reset]
//!
//! `--reset` empties every table first. Without it the script refuses to run
//! when the demo parent already exists.

use std::env;

use anyhow::{bail, Context, Result};
use clap::Parser;
use uuid::Uuid;

use chore_masters_api::{
    db::{self, ChildInsert, ChoreStore, PgStore},
    error::ApiError,
    models::{child::NewChild, parent::NewParent, prize::NewPrize, task::NewTask},
    services::validation,
};

const PARENT: &str = "Loving Mama";

const PRIZES: [(&str, i64, &str); 2] = [
    ("Lego", 100, "https://media.istockphoto.com/id/1179503632/photo/heap-of-plastic-block-toy-background.jpg"),
    ("Barbie", 80, "https://media.istockphoto.com/id/487695805/photo/barbie-doll-group-shot.jpg"),
];

const TASKS: [(&str, i64, &str); 5] = [
    ("Vacuuming", 20, "https://media.istockphoto.com/id/1936830995/vector/vacuum-cleaner-on-white-background.jpg"),
    ("Washing dishes", 10, "https://media.istockphoto.com/id/1287750016/vector/plate-and-sponge-in-hand-line-and-solid-icon-hygiene-routine-concept-dishwashing-sign-on.jpg"),
    ("Laundry", 15, "https://media.istockphoto.com/id/156396667/vector/cartoon-washing-machine.jpg"),
    ("Brushing teeth", 25, "https://media.istockphoto.com/id/167588044/vector/tooth-mascot.jpg"),
    ("Making Bed", 30, "https://media.istockphoto.com/id/2185032034/vector/plus-size-black-woman-tidying-up-her-bed-household-work-housekeeping.jpg"),
];

/// (username, prize index, task indexes, picture)
const CHILDREN: [(&str, usize, &[usize], &str); 2] = [
    ("Cheeky Boy", 0, &[0, 2, 4], "https://media.istockphoto.com/id/164452038/vector/young-red-headed-boy-makes-silly-face-using-tongue-and-hands.jpg"),
    ("Princess Girl", 1, &[1, 3], "https://media.istockphoto.com/id/2207691230/vector/greeting-card-with-cute-cartoon-fairy-tale-princess-and-stars-little-girl-on-a-pink-dress-in.jpg"),
];

const PARENT_PIC: &str = "https://media.istockphoto.com/id/945446894/vector/children-boy-and-girl-daughter-and-son-kissing-hugging-their-mom-happy-mothers-day-isolated.jpg";

#[derive(Parser)]
#[command(name = "seed-demo", about = "Seed a demo family into the Chore Masters database")]
struct Args {
    /// Password for every demo account; must pass the signup password rules
    #[arg(long, default_value = "Password1!", value_parser = demo_password)]
    password: String,

    /// Empty all tables before seeding
    #[arg(long)]
    reset: bool,
}

fn demo_password(raw: &str) -> Result<String, ApiError> {
    validation::password(Some(raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL required")?;
    let cost = env::var("BCRYPT_COST")
        .ok()
        .and_then(|c| c.parse().ok())
        .unwrap_or(bcrypt::DEFAULT_COST);

    println!("=== Seed Demo Family ===");

    let pool = db::create_pool(&database_url, 5)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool).await.context("Failed to run migrations")?;

    if args.reset {
        println!("Emptying tables...");
        sqlx::query("TRUNCATE parents, prizes, tasks, children, child_tasks, child_task_images")
            .execute(&pool)
            .await
            .context("Failed to truncate tables")?;
    }

    let store = PgStore::new(pool.clone());
    if store.username_taken(PARENT).await? {
        bail!("\"{PARENT}\" already exists; rerun with --reset to start over");
    }

    let password_hash = bcrypt::hash(&args.password, cost).context("Failed to hash password")?;

    println!("Creating parent {PARENT}...");
    let parent = store
        .insert_parent(NewParent {
            username: PARENT.into(),
            password_hash: password_hash.clone(),
            profile_pic: PARENT_PIC.into(),
        })
        .await?
        .context("Parent username already taken")?;

    println!("Creating prizes...");
    let mut prize_ids: Vec<Uuid> = Vec::new();
    for (name, value, image_url) in PRIZES {
        let prize = store
            .insert_prize(
                parent.id,
                NewPrize { name: name.into(), value, image_url: image_url.into() },
            )
            .await?
            .context("Parent vanished while seeding")?;
        println!("  {name} ({value})");
        prize_ids.push(prize.id);
    }

    println!("Creating tasks...");
    let mut task_ids: Vec<Uuid> = Vec::new();
    for (name, value, image_url) in TASKS {
        let task = store
            .insert_task(
                parent.id,
                NewTask { name: name.into(), value, image_url: image_url.into() },
            )
            .await?
            .context("Parent vanished while seeding")?;
        println!("  {name} ({value})");
        task_ids.push(task.id);
    }

    println!("Creating children...");
    for (username, prize, tasks, image_url) in CHILDREN {
        let outcome = store
            .insert_child(
                parent.id,
                NewChild {
                    username: username.into(),
                    password_hash: password_hash.clone(),
                    prize_id: prize_ids[prize],
                    task_ids: tasks.iter().map(|&i| task_ids[i]).collect(),
                    image_url: image_url.into(),
                },
            )
            .await
            .with_context(|| format!("Failed to create child {username}"))?;
        if !matches!(outcome, ChildInsert::Created(_)) {
            bail!("Child {username} was not created: {outcome:?}");
        }
        println!("  {username}");
    }

    pool.close().await;
    println!("Done. Log in as \"{PARENT}\", \"Cheeky Boy\" or \"Princess Girl\".");
    Ok(())
}
