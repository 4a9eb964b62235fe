//! End-to-end test against a real endpoint.
//!
//! Runs only when `REDSHIFT_HOST` (and the other `REDSHIFT_*` variables) are
//! set; any Postgres-compatible server works.

use redshift_qb::{QbError, QbResult, QueryBuilder, Value};

#[tokio::test]
async fn builder_roundtrip() -> QbResult<()> {
    let mut qb = match QueryBuilder::from_env() {
        Ok(qb) => qb,
        Err(QbError::Config(reason)) => {
            eprintln!("{reason}; skipping builder_roundtrip");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    qb.connect().await?;

    qb.raw("CREATE TEMP TABLE qb_items (id INTEGER, name VARCHAR(32), sold_on DATE)")
        .await?;
    let inserted = qb
        .raw(
            "INSERT INTO qb_items VALUES \
             (1, 'a', '2024-01-05'), (2, 'b', '2024-02-10'), (3, 'c', '2024-06-01')",
        )
        .await?;
    assert_eq!(inserted, 3);

    let in_q1 = qb
        .select(["COUNT(*)"])
        .where_between("sold_on", "2024-01-01", "2024-03-31")
        .count("qb_items")
        .await?;
    assert_eq!(in_q1, 2);

    let row = qb
        .reset()
        .where_("id", 2)
        .first("qb_items")
        .await?
        .expect("row with id 2");
    assert_eq!(row.get("name"), Some(&Value::from("b")));
    assert_eq!(row.columns(), &["id", "name", "sold_on"]);

    let updated = qb
        .reset()
        .where_("id", 3)
        .update("qb_items", [("name", "z")])
        .await?;
    assert_eq!(updated, 1);

    let deleted = qb.reset().where_("id", 1).delete("qb_items").await?;
    assert_eq!(deleted, 1);

    let rest = qb.reset().select(["id", "name"]).get("qb_items").await?;
    assert_eq!(rest.len(), 2);
    assert!(rest.iter().any(|r| r.get("name") == Some(&Value::from("z"))));

    assert_eq!(qb.raw("SELECT 1").await?, 0);

    qb.disconnect().await?;
    assert!(!qb.is_connected());
    Ok(())
}
