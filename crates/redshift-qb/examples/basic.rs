//! Basic usage example for redshift-qb
//!
//! Run with: cargo run --example basic -p redshift-qb
//!
//! Set the connection in a .env file or environment variables:
//! REDSHIFT_HOST=examplecluster.abc123.us-west-2.redshift.amazonaws.com
//! REDSHIFT_USER=awsuser
//! REDSHIFT_PASSWORD=secret
//! REDSHIFT_DATABASE=dev

use redshift_qb::{QbError, QueryBuilder};

#[tokio::main]
async fn main() -> Result<(), QbError> {
    let mut qb = QueryBuilder::from_env()?;
    qb.connect().await?;

    // Setup: a scratch table that lives for this session only
    qb.raw(
        "CREATE TEMP TABLE sales (
            id INTEGER,
            region VARCHAR(16),
            amount DECIMAL(10, 2),
            sold_on DATE
        )",
    )
    .await?;

    let inserted = qb
        .raw(
            "INSERT INTO sales VALUES
                (1, 'north', 120.00, '2024-01-15'),
                (2, 'south', 80.50, '2024-02-03'),
                (3, 'north', 42.25, '2024-02-20'),
                (4, 'west', 310.00, '2024-05-11')",
        )
        .await?;
    println!("Inserted {inserted} rows");

    // ============================================
    // Example 1: Rendering without executing
    // ============================================
    println!("\n=== Rendered SQL ===");

    qb.select(["region", "SUM(amount) AS total"])
        .where_between("sold_on", "2024-01-01", "2024-03-31")
        .group_by(["region"]);

    let built = qb.build_query("sales");
    println!("placeholders:\n{}", built.sql());
    println!("inlined:\n{}", qb.sql("sales"));

    // ============================================
    // Example 2: get() with grouping
    // ============================================
    println!("\n=== get() ===");

    for row in qb.get("sales").await? {
        println!("  {}", serde_json::to_string(&row).unwrap_or_default());
    }

    // ============================================
    // Example 3: count()
    // ============================================
    println!("\n=== count() ===");

    let north = qb
        .reset()
        .select(["COUNT(*)"])
        .where_("region", "north")
        .count("sales")
        .await?;
    println!("north rows: {north}");

    // ============================================
    // Example 4: first()
    // ============================================
    println!("\n=== first() ===");

    match qb.reset().where_op("amount", ">", 100).first("sales").await? {
        Some(row) => println!("first big sale: {:?}", row.get("id")),
        None => println!("no big sales"),
    }

    // ============================================
    // Example 5: update() and delete()
    // ============================================
    println!("\n=== update() / delete() ===");

    let updated = qb
        .reset()
        .where_("region", "west")
        .update("sales", [("region", "east")])
        .await?;
    println!("updated {updated} rows");

    let deleted = qb.reset().where_("id", 2).delete("sales").await?;
    println!("deleted {deleted} rows");

    let remaining = qb.reset().select(["COUNT(*)"]).count("sales").await?;
    println!("remaining rows: {remaining}");

    qb.disconnect().await?;
    Ok(())
}
