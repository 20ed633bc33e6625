use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use kassa::{
    auth::AuthTokens,
    config::Settings,
    domain::{LocalizedText, Pricing, Role, User},
    repository::{
        PricingRepository, SqlitePricingRepository, SqliteUserRepository, UserRepository,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("🌱 Starting database seeding...");

    let settings = Settings::new().unwrap_or_else(|_| Settings::default());

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&settings.database.url)
        .await?;

    // Run migrations first
    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let user_repo = SqliteUserRepository::new(db_pool.clone());
    let pricing_repo = SqlitePricingRepository::new(db_pool.clone());
    let tokens = AuthTokens::new(&settings.auth.jwt_secret, settings.auth.token_ttl_hours);

    // Seed users
    println!("👥 Creating users...");

    let admin = user_repo
        .create(User {
            id: Uuid::new_v4(),
            email: "admin@kassa.local".to_string(),
            name: Some("Admin".to_string()),
            role: Role::Admin,
            created_at: Utc::now(),
        })
        .await?;
    println!("  ✅ Created admin user (admin@kassa.local)");

    let alice = user_repo
        .create(User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            name: Some("Alice Johnson".to_string()),
            role: Role::User,
            created_at: Utc::now(),
        })
        .await?;
    println!("  ✅ Created customer (alice@example.com)");

    // Seed pricing plans
    println!("💳 Creating pricing plans...");

    let plans = [
        ("Landing page", "Лендинг", "Լենդինգ", 150_000_00_i64, false),
        ("Online store", "Интернет-магазин", "Առցանց խանութ", 350_000_00, true),
        ("Custom project", "Индивидуальный проект", "Անհատական նախագիծ", 600_000_00, false),
    ];

    for (position, (en, ru, hy, price_minor, is_popular)) in plans.into_iter().enumerate() {
        let now = Utc::now();
        let plan = pricing_repo
            .create(Pricing {
                id: Uuid::new_v4(),
                title: LocalizedText {
                    en: Some(en.to_string()),
                    ru: Some(ru.to_string()),
                    hy: Some(hy.to_string()),
                },
                description: LocalizedText::default(),
                price_minor,
                position: position as i64,
                is_popular,
                created_at: now,
                updated_at: now,
            })
            .await?;
        println!("  ✅ Created plan \"{}\" ({})", en, plan.id);
    }

    // Bearer tokens for poking the API by hand
    println!("\n🔑 Tokens:");
    println!("  admin: {}", tokens.issue(&admin)?);
    println!("  alice: {}", tokens.issue(&alice)?);

    println!("\n✨ Seeding complete!");

    Ok(())
}
