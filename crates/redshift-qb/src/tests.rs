//! Builder and execution tests against an in-memory session.

use crate::{ConnectOptions, Op, QbError, QbResult, Query, QueryBuilder, Record, Session, Value};
use std::collections::VecDeque;

/// One statement seen by [`RecordingSession`].
#[derive(Debug, Clone, PartialEq)]
enum Call {
    Fetch(String, Vec<Value>),
    Commit(String, Vec<Value>),
    Raw(String),
}

/// A session that records statements and replays canned results.
#[derive(Debug, Default)]
struct RecordingSession {
    calls: Vec<Call>,
    results: VecDeque<Vec<Record>>,
    affected: u64,
}

impl RecordingSession {
    fn returning(rows: Vec<Record>) -> Self {
        Self {
            results: VecDeque::from([rows]),
            ..Self::default()
        }
    }
}

impl Session for RecordingSession {
    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> QbResult<Vec<Record>> {
        self.calls.push(Call::Fetch(sql.to_string(), params.to_vec()));
        Ok(self.results.pop_front().unwrap_or_default())
    }

    async fn execute_commit(&mut self, sql: &str, params: &[Value]) -> QbResult<u64> {
        self.calls.push(Call::Commit(sql.to_string(), params.to_vec()));
        Ok(self.affected)
    }

    async fn execute_raw(&mut self, sql: &str) -> QbResult<u64> {
        self.calls.push(Call::Raw(sql.to_string()));
        Ok(self.affected)
    }
}

fn options() -> ConnectOptions {
    ConnectOptions::new("localhost", "awsuser", "secret", "dev")
}

fn builder(session: RecordingSession) -> QueryBuilder<RecordingSession> {
    QueryBuilder::with_session(options(), session)
}

// ==================== Rendering ====================

#[test]
fn select_defaults_to_wildcard() {
    assert_eq!(Query::new().build_query("users").sql(), "SELECT * FROM users\n");
}

#[test]
fn select_replaces_columns() {
    let q = Query::new().select(["a", "b"]);
    assert_eq!(q.build_query("t").sql(), "SELECT a, b FROM t\n");
}

#[test]
fn empty_select_keeps_previous_columns() {
    let q = Query::new().select(["a", "b"]).select(Vec::<String>::new());
    assert_eq!(q.build_query("t").sql(), "SELECT a, b FROM t\n");

    let q = Query::new().select(Vec::<&str>::new());
    assert_eq!(q.build_query("t").sql(), "SELECT * FROM t\n");
}

#[test]
fn where_calls_render_in_order() {
    let q = Query::new()
        .where_("a", 1)
        .where_op("b", ">", 2)
        .where_op("c", Op::Like, "x%");
    let built = q.build_query("t");

    assert_eq!(
        built.sql(),
        "SELECT * FROM t\nWHERE a = %s AND b > %s AND c LIKE %s\n"
    );
    assert_eq!(
        built.numbered_sql(),
        "SELECT * FROM t\nWHERE a = $1 AND b > $2 AND c LIKE $3\n"
    );
    assert_eq!(
        built.params(),
        &[Value::Int(1), Value::Int(2), Value::Text("x%".into())]
    );
}

#[test]
fn one_and_per_condition() {
    let mut q = Query::new();
    for i in 0..5 {
        q = q.where_(format!("c{i}"), i);
    }
    let sql = q.build_query("t").sql();
    assert_eq!(sql.matches(" AND ").count(), 4);
    assert_eq!(sql.matches("%s").count(), 5);
}

#[test]
fn operator_passes_through_verbatim() {
    let q = Query::new().where_op("name", "IS DISTINCT FROM", "bob");
    assert_eq!(
        q.build_query("t").sql(),
        "SELECT * FROM t\nWHERE name IS DISTINCT FROM %s\n"
    );
}

#[test]
fn where_between_inlines_bounds() {
    let q = Query::new().where_between("d", "2020-01-01", "2020-12-31");
    let built = q.build_query("t");

    assert_eq!(
        built.sql(),
        "SELECT * FROM t\nWHERE d BETWEEN '2020-01-01' AND '2020-12-31'\n"
    );
    assert!(built.params().is_empty());
}

#[test]
fn clause_order_is_select_where_group_by() {
    let q = Query::new()
        .group_by(["region", "year"])
        .select(["region", "year", "COUNT(*)"])
        .where_("status", "ok");

    assert_eq!(
        q.build_query("sales").sql(),
        "SELECT region, year, COUNT(*) FROM sales\nWHERE status = %s\nGROUP BY region, year\n"
    );
}

#[test]
fn empty_group_by_adds_no_clause() {
    let q = Query::new().group_by(Vec::<&str>::new());
    assert_eq!(q.group_by_columns(), None);
    assert_eq!(q.build_query("t").sql(), "SELECT * FROM t\n");

    let q = Query::new().group_by(["region"]).group_by(Vec::<String>::new());
    assert_eq!(
        q.build_query("t").sql(),
        "SELECT * FROM t\nGROUP BY region\n"
    );
}

#[test]
fn sql_inlines_literals() {
    let q = Query::new()
        .where_("name", "o'neil")
        .where_("age", 30)
        .where_between("d", "2020-01-01", "2020-12-31");

    assert_eq!(
        q.sql("people"),
        "SELECT * FROM people\nWHERE name = 'o''neil' AND age = 30 AND d BETWEEN '2020-01-01' AND '2020-12-31'\n"
    );
}

#[test]
fn update_renders_set_then_where() {
    let q = Query::new().where_("id", 1);
    let built = q.build_update("t", [("x", 5)]);

    assert_eq!(built.sql(), "UPDATE t SET x = %s\nWHERE id = %s\n");
    assert_eq!(built.params(), &[Value::Int(5), Value::Int(1)]);
}

#[test]
fn update_multiple_columns_without_conditions() {
    let built = Query::new().build_update(
        "t",
        vec![("a", Value::from("x")), ("b", Value::Null)],
    );
    assert_eq!(built.sql(), "UPDATE t SET a = %s, b = %s\n");
    assert_eq!(built.param_count(), 2);
}

#[test]
fn update_and_delete_narrow_operators_to_eq() {
    let q = Query::new()
        .where_op("age", ">", 18)
        .where_between("d", "2020-01-01", "2020-12-31");

    let update = q.build_update("t", [("flag", true)]);
    assert_eq!(update.sql(), "UPDATE t SET flag = %s\nWHERE age = %s AND d = %s\n");
    assert_eq!(
        update.params(),
        &[
            Value::Bool(true),
            Value::Int(18),
            Value::Text("'2020-01-01' AND '2020-12-31'".into()),
        ]
    );

    let delete = q.build_delete("t");
    assert_eq!(delete.sql(), "DELETE FROM t\nWHERE age = %s AND d = %s\n");
    assert_eq!(delete.param_count(), 2);
}

#[test]
fn delete_without_conditions() {
    assert_eq!(Query::new().build_delete("t").sql(), "DELETE FROM t\n");
}

// ==================== Builder state ====================

#[test]
fn builder_conditions_accumulate_until_reset() {
    let mut qb = builder(RecordingSession::default());
    qb.where_("a", 1);
    qb.where_("b", 2);
    assert_eq!(qb.query().conditions().len(), 2);

    qb.reset();
    assert!(qb.query().conditions().is_empty());
    assert_eq!(qb.build_query("t").sql(), "SELECT * FROM t\n");
}

#[test]
fn builder_chains_like_query() {
    let mut qb = builder(RecordingSession::default());
    qb.select(["a"]).where_between("d", 1, 2).group_by(["a"]);
    let expected = Query::new()
        .select(["a"])
        .where_between("d", 1, 2)
        .group_by(["a"]);
    assert_eq!(qb.query(), &expected);
    assert_eq!(qb.sql("t"), expected.sql("t"));
}

// ==================== Execution ====================

#[tokio::test]
async fn get_binds_values_and_returns_records() {
    let rows = vec![
        Record::from_pairs([("id", Value::Int(1)), ("name", Value::from("a"))]),
        Record::from_pairs([("id", Value::Int(2)), ("name", Value::from("b"))]),
    ];
    let mut qb = builder(RecordingSession::returning(rows.clone()));

    let got = qb.where_("status", "active").get("users").await.unwrap();
    assert_eq!(got, rows);

    let session = qb.session().unwrap();
    assert_eq!(
        session.calls,
        vec![Call::Fetch(
            "SELECT * FROM users\nWHERE status = $1\n".into(),
            vec![Value::from("active")],
        )]
    );
}

#[tokio::test]
async fn get_with_no_rows_is_empty() {
    let mut qb = builder(RecordingSession::default());
    assert!(qb.get("users").await.unwrap().is_empty());
}

#[tokio::test]
async fn first_appends_limit_and_returns_none_on_empty() {
    let mut qb = builder(RecordingSession::default());
    assert_eq!(qb.first("t").await.unwrap(), None);

    let session = qb.session().unwrap();
    assert_eq!(
        session.calls,
        vec![Call::Fetch("SELECT * FROM t\nLIMIT 1".into(), vec![])]
    );
}

#[tokio::test]
async fn first_returns_single_record() {
    let row = Record::from_pairs([("id", 7)]);
    let mut qb = builder(RecordingSession::returning(vec![row.clone()]));
    assert_eq!(qb.first("t").await.unwrap(), Some(row));
}

#[tokio::test]
async fn count_reads_first_column_of_first_row() {
    let rows = vec![Record::from_pairs([("count", 42i64)])];
    let mut qb = builder(RecordingSession::returning(rows));

    let n = qb
        .select(["COUNT(*)"])
        .where_("a", 1)
        .where_between("d", "2020-01-01", "2020-12-31")
        .count("t")
        .await
        .unwrap();
    assert_eq!(n, 42);

    // The BETWEEN bounds are inlined, so only the standard value is bound.
    let session = qb.session().unwrap();
    assert_eq!(
        session.calls,
        vec![Call::Fetch(
            "SELECT COUNT(*) FROM t\nWHERE a = $1 AND d BETWEEN '2020-01-01' AND '2020-12-31'\n"
                .into(),
            vec![Value::Int(1)],
        )]
    );
}

#[tokio::test]
async fn count_without_rows_is_not_found() {
    let mut qb = builder(RecordingSession::default());
    let err = qb.count("t").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn count_rejects_non_integer() {
    let rows = vec![Record::from_pairs([("name", "x")])];
    let mut qb = builder(RecordingSession::returning(rows));
    let err = qb.count("t").await.unwrap_err();
    assert!(matches!(err, QbError::Decode { ref column, .. } if column == "name"));
}

#[tokio::test]
async fn update_binds_set_values_before_conditions() {
    let session = RecordingSession {
        affected: 3,
        ..RecordingSession::default()
    };
    let mut qb = builder(session);

    let n = qb.where_("id", 1).update("t", [("x", 5)]).await.unwrap();
    assert_eq!(n, 3);

    let session = qb.session().unwrap();
    assert_eq!(
        session.calls,
        vec![Call::Commit(
            "UPDATE t SET x = $1\nWHERE id = $2\n".into(),
            vec![Value::Int(5), Value::Int(1)],
        )]
    );
}

#[tokio::test]
async fn delete_commits_with_condition_values() {
    let session = RecordingSession {
        affected: 1,
        ..RecordingSession::default()
    };
    let mut qb = builder(session);

    let n = qb.where_("id", 9).delete("t").await.unwrap();
    assert_eq!(n, 1);

    let session = qb.session().unwrap();
    assert_eq!(
        session.calls,
        vec![Call::Commit(
            "DELETE FROM t\nWHERE id = $1\n".into(),
            vec![Value::Int(9)],
        )]
    );
}

#[tokio::test]
async fn raw_runs_verbatim() {
    let mut qb = builder(RecordingSession::default());
    qb.where_("ignored", 1);

    let n = qb.raw("SELECT 1").await.unwrap();
    assert_eq!(n, 0);

    let session = qb.session().unwrap();
    assert_eq!(session.calls, vec![Call::Raw("SELECT 1".into())]);
}

#[tokio::test]
async fn conditions_persist_across_executions() {
    let mut qb = builder(RecordingSession::default());
    qb.where_("a", 1);
    qb.get("t").await.unwrap();
    qb.where_("b", 2);
    qb.get("t").await.unwrap();

    let session = qb.session().unwrap();
    assert_eq!(
        session.calls[1],
        Call::Fetch(
            "SELECT * FROM t\nWHERE a = $1 AND b = $2\n".into(),
            vec![Value::Int(1), Value::Int(2)],
        )
    );
}

#[tokio::test]
async fn query_value_executes_without_builder() {
    let mut session = RecordingSession::default();
    let q = Query::new().where_("id", 1);

    q.get("a", &mut session).await.unwrap();
    q.get("b", &mut session).await.unwrap();

    assert_eq!(
        session.calls,
        vec![
            Call::Fetch("SELECT * FROM a\nWHERE id = $1\n".into(), vec![Value::Int(1)]),
            Call::Fetch("SELECT * FROM b\nWHERE id = $1\n".into(), vec![Value::Int(1)]),
        ]
    );
}

#[tokio::test]
async fn execute_before_connect_fails() {
    let mut qb = QueryBuilder::with_options(options());
    assert!(!qb.is_connected());

    assert!(qb.get("t").await.unwrap_err().is_not_connected());
    assert!(qb.count("t").await.unwrap_err().is_not_connected());
    assert!(qb.raw("SELECT 1").await.unwrap_err().is_not_connected());
    assert!(qb.delete("t").await.unwrap_err().is_not_connected());
}

#[tokio::test]
async fn disconnect_drops_session() {
    let mut qb = builder(RecordingSession::default());
    assert!(qb.is_connected());

    qb.disconnect().await.unwrap();
    assert!(!qb.is_connected());
    assert!(qb.first("t").await.unwrap_err().is_not_connected());

    // Disconnecting twice is fine.
    qb.disconnect().await.unwrap();
}
