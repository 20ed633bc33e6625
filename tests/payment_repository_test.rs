use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use kassa::domain::{
    LocalizedText, Payment, PaymentStatus, Pricing, Purchase, PurchaseStatus, Role, User,
};
use kassa::error::AppError;
use kassa::repository::{
    PaymentRepository, PricingRepository, PurchaseRepository, SqlitePaymentRepository,
    SqlitePricingRepository, SqlitePurchaseRepository, SqliteUserRepository, UserRepository,
};

async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("connect in-memory database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}

async fn seed_user_and_plan(pool: &SqlitePool) -> (User, Pricing) {
    let users = SqliteUserRepository::new(pool.clone());
    let pricing = SqlitePricingRepository::new(pool.clone());

    let user = users
        .create(User {
            id: Uuid::new_v4(),
            email: format!("payer-{}@example.com", Uuid::new_v4()),
            name: Some("Payer".to_string()),
            role: Role::User,
            created_at: Utc::now(),
        })
        .await
        .expect("create user");

    let now = Utc::now();
    let plan = pricing
        .create(Pricing {
            id: Uuid::new_v4(),
            title: LocalizedText {
                ru: Some("Базовый".to_string()),
                en: Some("Basic".to_string()),
                hy: None,
            },
            description: LocalizedText::default(),
            price_minor: 1000,
            position: 0,
            is_popular: false,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("create pricing plan");

    (user, plan)
}

fn pending_payment(user: &User, plan: &Pricing, external_id: Option<&str>) -> Payment {
    let now = Utc::now();
    Payment {
        id: Uuid::new_v4(),
        user_id: user.id,
        pricing_id: plan.id,
        external_payment_id: external_id.map(str::to_string),
        amount_minor: plan.price_minor,
        title: "Basic".to_string(),
        status: PaymentStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

fn completed_purchase(user: &User, plan: &Pricing, payment_id: Option<Uuid>) -> Purchase {
    let now = Utc::now();
    Purchase {
        id: Uuid::new_v4(),
        user_id: user.id,
        pricing_id: plan.id,
        payment_id,
        title: "Basic".to_string(),
        price_minor: plan.price_minor,
        status: PurchaseStatus::Completed,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_payment_lifecycle() -> anyhow::Result<()> {
    let pool = setup_pool().await;
    let (user, plan) = seed_user_and_plan(&pool).await;
    let repo = SqlitePaymentRepository::new(pool.clone());

    let payment = repo.create(pending_payment(&user, &plan, None)).await?;
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert!(payment.external_payment_id.is_none());

    repo.set_external_id(payment.id, "gw-1").await?;
    let found = repo.find_by_id(payment.id).await?.unwrap();
    assert_eq!(found.external_payment_id.as_deref(), Some("gw-1"));

    // Owner-filtered lookup hides the payment from everyone else.
    assert!(repo.find_owned(payment.id, user.id).await?.is_some());
    assert!(repo.find_owned(payment.id, Uuid::new_v4()).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_mark_succeeded_is_single_shot() -> anyhow::Result<()> {
    let pool = setup_pool().await;
    let (user, plan) = seed_user_and_plan(&pool).await;
    let repo = SqlitePaymentRepository::new(pool.clone());

    let payment = repo
        .create(pending_payment(&user, &plan, Some("gw-2")))
        .await?;

    // First delivery wins the conditional update.
    let won = repo.mark_succeeded("gw-2").await?;
    assert_eq!(won.as_ref().map(|p| p.id), Some(payment.id));
    assert_eq!(won.unwrap().status, PaymentStatus::Succeeded);

    // Replays and unknown ids see no pending row.
    assert!(repo.mark_succeeded("gw-2").await?.is_none());
    assert!(repo.mark_succeeded("gw-unknown").await?.is_none());

    let stored = repo.find_by_id(payment.id).await?.unwrap();
    assert_eq!(stored.status, PaymentStatus::Succeeded);

    Ok(())
}

#[tokio::test]
async fn test_cancel_stale_sweeps_only_old_pending_payments() -> anyhow::Result<()> {
    let pool = setup_pool().await;
    let (user, plan) = seed_user_and_plan(&pool).await;
    let repo = SqlitePaymentRepository::new(pool.clone());

    let stale = repo
        .create(pending_payment(&user, &plan, Some("gw-stale")))
        .await?;
    let succeeded = repo
        .create(pending_payment(&user, &plan, Some("gw-done")))
        .await?;
    repo.mark_succeeded("gw-done").await?;

    // Everything created so far is in the past relative to this cutoff;
    // the fresh payment below is not.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let cutoff = Utc::now();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let fresh = repo
        .create(pending_payment(&user, &plan, Some("gw-fresh")))
        .await?;

    let swept = repo.cancel_stale(cutoff).await?;
    assert_eq!(swept, 1);

    assert_eq!(
        repo.find_by_id(stale.id).await?.unwrap().status,
        PaymentStatus::Cancelled
    );
    // A succeeded payment is never reverted by the sweep.
    assert_eq!(
        repo.find_by_id(succeeded.id).await?.unwrap().status,
        PaymentStatus::Succeeded
    );
    assert_eq!(
        repo.find_by_id(fresh.id).await?.unwrap().status,
        PaymentStatus::Pending
    );

    Ok(())
}

#[tokio::test]
async fn test_one_purchase_per_payment() -> anyhow::Result<()> {
    let pool = setup_pool().await;
    let (user, plan) = seed_user_and_plan(&pool).await;
    let payments = SqlitePaymentRepository::new(pool.clone());
    let purchases = SqlitePurchaseRepository::new(pool.clone());

    let payment = payments
        .create(pending_payment(&user, &plan, Some("gw-3")))
        .await?;

    purchases
        .create(completed_purchase(&user, &plan, Some(payment.id)))
        .await?;

    // The unique index turns a second insert for the same payment into a
    // conflict the materializer can recover from.
    let duplicate = purchases
        .create(completed_purchase(&user, &plan, Some(payment.id)))
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    // Manual purchases carry no payment reference and never conflict.
    purchases.create(completed_purchase(&user, &plan, None)).await?;
    purchases.create(completed_purchase(&user, &plan, None)).await?;

    assert_eq!(purchases.list_by_user(user.id).await?.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_purchase_status_updates() -> anyhow::Result<()> {
    let pool = setup_pool().await;
    let (user, plan) = seed_user_and_plan(&pool).await;
    let purchases = SqlitePurchaseRepository::new(pool.clone());

    let purchase = purchases
        .create(completed_purchase(&user, &plan, None))
        .await?;

    let updated = purchases
        .update_status(purchase.id, PurchaseStatus::Cancelled)
        .await?;
    assert_eq!(updated.status, PurchaseStatus::Cancelled);

    let missing = purchases
        .update_status(Uuid::new_v4(), PurchaseStatus::Completed)
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_pricing_listing_orders_by_position() -> anyhow::Result<()> {
    let pool = setup_pool().await;
    let pricing = SqlitePricingRepository::new(pool.clone());

    let now = Utc::now();
    for (position, name) in [(2, "Pro"), (1, "Basic")] {
        pricing
            .create(Pricing {
                id: Uuid::new_v4(),
                title: LocalizedText {
                    en: Some(name.to_string()),
                    ..Default::default()
                },
                description: LocalizedText::default(),
                price_minor: 1000 * position,
                position,
                is_popular: false,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    let listed = pricing.list().await?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].title.preferred(), "Basic");
    assert_eq!(listed[1].title.preferred(), "Pro");

    Ok(())
}
