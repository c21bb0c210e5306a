#![allow(dead_code)]

use std::time::{Duration, Instant};

use mysql::{Opts, OptsBuilder, Pool};
use rusty_mysql_kit::{ExecStatus, MysqlExecutor, RawResult, Row, ScriptedExecutor, Value};

pub fn row<const N: usize>(pairs: [(&str, Value); N]) -> Row {
    pairs.into_iter().collect()
}

pub fn inserted(id: u64) -> RawResult {
    RawResult::Status(ExecStatus {
        affected_rows: 1,
        last_insert_id: Some(id),
        info: String::new(),
    })
}

pub fn scripted(results: Vec<RawResult>) -> ScriptedExecutor {
    let exec = ScriptedExecutor::new();
    for result in results {
        exec.push(result);
    }
    exec
}

/// URL of a disposable MySQL server, when one is provided through `MYSQL_TEST_URL`.
pub fn live_url() -> Option<String> {
    std::env::var("MYSQL_TEST_URL").ok().filter(|u| !u.is_empty())
}

pub fn pool_for_url(url: &str) -> anyhow::Result<Pool> {
    let opts = OptsBuilder::from_opts(Opts::from_url(url)?)
        .tcp_connect_timeout(Some(Duration::from_secs(1)));
    Ok(Pool::new(opts)?)
}

pub fn live_executor(url: &str) -> anyhow::Result<MysqlExecutor> {
    let pool = pool_for_url(url)?;
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        match pool.get_conn() {
            Ok(_) => return Ok(MysqlExecutor::new(pool)),
            Err(_) => std::thread::sleep(Duration::from_millis(200)),
        }
    }
    Err(anyhow::anyhow!("could not connect to server at {url}"))
}
