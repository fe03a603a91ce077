use super::{Browser, Page, types::*};
use crate::config::{Config, ListingSelectors};
use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct BridgeBrowser {
    conn: Rc<RefCell<Connection>>,
    program: PathBuf,
}

pub struct BridgePage {
    conn: Rc<RefCell<Connection>>,
    page_id: String,
}

// Newline-delimited JSON: `{"id", "cmd", ...}` out, `{"id", "ok", "result", "error"}` back.
struct Connection {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    next_id: u64,
    request_timeout: Duration,
    grace: Duration,
    closed: bool,
}

#[derive(Debug, Deserialize)]
struct Reply {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewPageOut {
    page: String,
}

impl BridgeBrowser {
    pub fn launch(cfg: &Config) -> Result<Self> {
        let program = resolve_program(&cfg.driver.command);
        debug!(
            "launching driver {} {:?} headless={}",
            program.display(),
            cfg.driver.args,
            cfg.automation.headless
        );

        let mut cmd = Command::new(&program);
        cmd.args(&cfg.driver.args);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        for (k, v) in &cfg.driver.env {
            cmd.env(k, v);
        }
        cmd.env(
            "AUTO_APPLY_HEADLESS",
            if cfg.automation.headless { "1" } else { "0" },
        );

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning browser driver: {}", program.display()))?;

        let stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow!("no stdout"))?;

        // The reader thread owns stdout so a chatty driver can never block on a
        // full pipe while we are between requests.
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        if let Some(stderr) = child.stderr.take() {
            let log_stderr = cfg.driver.log_stderr;
            std::thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    if log_stderr {
                        debug!(target: "driver", "{}", line.trim_end());
                    }
                }
            });
        }

        Ok(Self {
            conn: Rc::new(RefCell::new(Connection {
                child,
                stdin,
                lines: rx,
                next_id: 0,
                request_timeout: cfg.driver.request_timeout(),
                grace: cfg.driver.grace(),
                closed: false,
            })),
            program,
        })
    }

    pub fn handshake(&mut self) -> Result<DriverDiag> {
        let mut diag: DriverDiag = self.conn.borrow_mut().call_as("version", json!({}), None)?;
        if diag.driver.is_empty() {
            diag.driver = self.program.display().to_string();
        }
        Ok(diag)
    }
}

impl Browser for BridgeBrowser {
    type Page = BridgePage;

    fn new_page(&mut self) -> Result<BridgePage> {
        let out: NewPageOut = self.conn.borrow_mut().call_as("new_page", json!({}), None)?;
        Ok(BridgePage {
            conn: Rc::clone(&self.conn),
            page_id: out.page,
        })
    }

    fn close(&mut self) -> Result<()> {
        self.conn.borrow_mut().shutdown()
    }
}

impl BridgePage {
    fn call(&self, cmd: &str, args: Value) -> Result<Value> {
        self.call_with(cmd, args, None)
    }

    fn call_with(&self, cmd: &str, mut args: Value, timeout: Option<Duration>) -> Result<Value> {
        if let Some(map) = args.as_object_mut() {
            map.insert("page".into(), Value::String(self.page_id.clone()));
        }
        self.conn.borrow_mut().call(cmd, args, timeout)
    }

    fn call_as<O: DeserializeOwned>(&self, cmd: &str, args: Value) -> Result<O> {
        let value = self.call(cmd, args)?;
        serde_json::from_value(value).with_context(|| format!("parsing driver reply to `{cmd}`"))
    }
}

impl Page for BridgePage {
    fn goto(&mut self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<()> {
        self.call_with(
            "goto",
            json!({
                "url": url,
                "wait_until": wait,
                "timeout_ms": timeout.as_millis() as u64,
            }),
            Some(timeout),
        )
        .with_context(|| format!("navigating to {url}"))?;
        Ok(())
    }

    fn current_url(&mut self) -> Result<String> {
        self.call_as("url", json!({}))
    }

    fn query(&mut self, selector: &str) -> Result<Option<ElementHandle>> {
        self.call_as("query", json!({ "selector": selector }))
    }

    fn click(&mut self, element: &ElementHandle) -> Result<()> {
        self.call("click", json!({ "element": element }))?;
        Ok(())
    }

    fn click_selector(&mut self, selector: &str) -> Result<()> {
        self.call("click_selector", json!({ "selector": selector }))?;
        Ok(())
    }

    fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        self.call("type", json!({ "selector": selector, "text": text }))?;
        Ok(())
    }

    fn select_option(&mut self, selector: &str, value: &str) -> Result<()> {
        self.call("select", json!({ "selector": selector, "value": value }))?;
        Ok(())
    }

    fn press_key(&mut self, key: &str) -> Result<()> {
        self.call("press", json!({ "key": key }))?;
        Ok(())
    }

    fn scrape_listings(&mut self, selectors: &ListingSelectors) -> Result<Vec<RawListing>> {
        self.call_as("scrape_listings", json!({ "selectors": selectors }))
    }

    fn form_fields(&mut self, selector: &str) -> Result<Vec<RawFormField>> {
        self.call_as("form_fields", json!({ "selector": selector }))
    }
}

impl Connection {
    fn call_as<O: DeserializeOwned>(
        &mut self,
        cmd: &str,
        args: Value,
        timeout: Option<Duration>,
    ) -> Result<O> {
        let value = self.call(cmd, args, timeout)?;
        serde_json::from_value(value).with_context(|| format!("parsing driver reply to `{cmd}`"))
    }

    fn call(&mut self, cmd: &str, args: Value, timeout: Option<Duration>) -> Result<Value> {
        if self.closed {
            bail!("driver session already closed");
        }

        self.next_id += 1;
        let id = self.next_id;
        let mut req = json!({ "id": id, "cmd": cmd });
        if let (Some(map), Value::Object(extra)) = (req.as_object_mut(), args) {
            map.extend(extra);
        }

        let mut line = serde_json::to_vec(&req)?;
        line.push(b'\n');
        self.stdin
            .write_all(&line)
            .and_then(|_| self.stdin.flush())
            .with_context(|| format!("writing `{cmd}` to driver"))?;

        let timeout = match timeout {
            Some(t) => (t + self.grace).max(self.request_timeout),
            None => self.request_timeout,
        };
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let raw = match self.lines.recv_timeout(remaining) {
                Ok(raw) => raw,
                Err(RecvTimeoutError::Timeout) => {
                    warn!("driver command `{cmd}` timed out after {:?}", timeout);
                    bail!("driver command `{cmd}` exceeded timeout ({timeout:?})");
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.closed = true;
                    bail!("driver exited while handling `{cmd}`");
                }
            };

            let reply: Reply = match serde_json::from_str(&raw) {
                Ok(reply) => reply,
                Err(_) => {
                    debug!(target: "driver", "{}", raw.trim_end());
                    continue;
                }
            };

            // Late answers to requests that already timed out.
            if reply.id < id {
                debug!("discarding stale driver reply id={}", reply.id);
                continue;
            }
            if reply.id != id {
                bail!("driver replied out of order: expected id {id}, got {}", reply.id);
            }
            if !reply.ok {
                let msg = reply
                    .error
                    .unwrap_or_else(|| format!("driver command `{cmd}` failed"));
                return Err(anyhow!(msg));
            }
            return Ok(reply.result);
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if let Err(err) = self.call("close", json!({}), None) {
            warn!("driver close request failed: {err:#}");
        }
        self.closed = true;

        let start = Instant::now();
        loop {
            if self.child.try_wait().with_context(|| "try_wait")?.is_some() {
                return Ok(());
            }
            if start.elapsed() > self.request_timeout {
                warn!("driver did not exit after close; killing it");
                let _ = self.child.kill();
                self.child.wait().with_context(|| "wait after kill")?;
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn resolve_program(raw: &str) -> PathBuf {
    if let Ok(env_val) = std::env::var("AUTO_APPLY_DRIVER") {
        if !env_val.trim().is_empty() {
            return expand_tilde(env_val.trim());
        }
    }
    expand_tilde(raw.trim())
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
