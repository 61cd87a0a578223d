//! Tool process client
//!
//! Spawns the spreadsheet tool server as a child process and speaks
//! newline-delimited JSON-RPC over its stdin/stdout. One request is in flight
//! at a time: the pipes live behind an async mutex held for a whole
//! write-then-read exchange.
//!
//! When a write fails because the child's stdin is gone, the client restarts
//! the process once (close, spawn, handshake) and replays the same request.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::logging::{self, Logger};
use crate::types::ToolCallOutcome;

use super::backend::ToolBackend;
use super::error::{RpcError, RpcResult};
use super::protocol::{self, ToolCallResult, ToolDescriptor, ToolListResult};

const MODULE: &str = "rpc::client";

/// MCP protocol revision sent in the handshake
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// How to launch the tool process
#[derive(Debug, Clone)]
pub struct ToolProcessConfig {
    /// Executable to run
    pub program: String,
    /// Arguments passed to the executable
    pub args: Vec<String>,
    /// Environment variable that tells the process where the workbooks live
    pub workspace_env_var: String,
    /// Workspace root handed to the process
    pub workspace_root: PathBuf,
    pub protocol_version: String,
    pub client_name: String,
    pub client_version: String,
}

impl Default for ToolProcessConfig {
    fn default() -> Self {
        Self {
            program: "uvx".to_string(),
            args: vec!["excel-mcp-server".to_string(), "stdio".to_string()],
            workspace_env_var: "EXCEL_FILES_PATH".to_string(),
            workspace_root: PathBuf::from("/excel_files"),
            protocol_version: PROTOCOL_VERSION.to_string(),
            client_name: "sheetsmith".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ToolProcessConfig {
    /// Launch `program` with `args`, keeping the other defaults
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    pub fn with_workspace_env_var(mut self, name: impl Into<String>) -> Self {
        self.workspace_env_var = name.into();
        self
    }
}

/// A running child and its pipes
struct ProcessHandle {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// JSON-RPC client for the tool process
pub struct ToolProcessClient {
    config: ToolProcessConfig,
    process: Mutex<Option<ProcessHandle>>,
    ready: AtomicBool,
    request_id: AtomicU64,
    restarts: AtomicUsize,
    logger: Arc<dyn Logger>,
}

impl ToolProcessClient {
    pub fn new(config: ToolProcessConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            config,
            process: Mutex::new(None),
            ready: AtomicBool::new(false),
            request_id: AtomicU64::new(0),
            restarts: AtomicUsize::new(0),
            logger,
        }
    }

    pub fn config(&self) -> &ToolProcessConfig {
        &self.config
    }

    /// Whether the handshake has completed on the current process
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Number of restarts triggered by broken pipes
    pub fn restart_count(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    /// Spawn the process, replacing any process already running
    pub async fn start(&self) -> RpcResult<()> {
        let mut slot = self.process.lock().await;
        self.close_locked(&mut slot).await;
        *slot = Some(self.spawn()?);
        Ok(())
    }

    /// Send `initialize` and wait for the server's answer.
    ///
    /// Returns the server's `initialize` result. The client is only marked
    /// ready when the handshake succeeds.
    pub async fn handshake(&self) -> RpcResult<Value> {
        let mut slot = self.process.lock().await;
        self.handshake_locked(&mut slot).await
    }

    /// Start the process and complete the handshake
    pub async fn initialize(&self) -> RpcResult<()> {
        self.start().await?;
        match self.handshake().await {
            Ok(_) => Ok(()),
            Err(e) => {
                self.logger
                    .error(&format!("[ToolProcess] Handshake failed: {}", e));
                Err(e)
            }
        }
    }

    /// Ask the server which tools it provides
    pub async fn list_tools(&self) -> RpcResult<Vec<ToolDescriptor>> {
        if !self.is_ready() {
            return Err(RpcError::NotInitialized);
        }
        let result = self.request_with_restart("tools/list", json!({})).await?;
        let list: ToolListResult = serde_json::from_value(result)?;
        Ok(list.tools)
    }

    /// Invoke one tool. Every failure is folded into the outcome.
    pub async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolCallOutcome {
        if !self.is_ready() {
            return ToolCallOutcome::failure(RpcError::NotInitialized.to_string());
        }

        let params = json!({ "name": name, "arguments": arguments });
        let result = match self.request_with_restart("tools/call", params).await {
            Ok(result) => result,
            Err(RpcError::Rpc { message, .. }) => return ToolCallOutcome::failure(message),
            Err(e) => return ToolCallOutcome::failure(e.to_string()),
        };

        match serde_json::from_value::<ToolCallResult>(result) {
            Ok(result) => result.into_outcome(),
            Err(e) => ToolCallOutcome::failure(
                RpcError::InvalidResponse(format!("tools/call result: {}", e)).to_string(),
            ),
        }
    }

    /// Kill and reap the process. Safe to call repeatedly.
    pub async fn close(&self) {
        let mut slot = self.process.lock().await;
        self.close_locked(&mut slot).await;
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    fn spawn(&self) -> RpcResult<ProcessHandle> {
        logging::info(
            MODULE,
            &format!(
                "Spawning {} {} ({}={})",
                self.config.program,
                self.config.args.join(" "),
                self.config.workspace_env_var,
                self.config.workspace_root.display()
            ),
        );

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .env(&self.config.workspace_env_var, &self.config.workspace_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RpcError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("tool process stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("tool process stdout not captured"))?;

        // The child must never block on a full stderr pipe.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    logging::debug("rpc::stderr", &line);
                }
            });
        }

        Ok(ProcessHandle {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    async fn handshake_locked(&self, slot: &mut Option<ProcessHandle>) -> RpcResult<Value> {
        self.ready.store(false, Ordering::SeqCst);

        let params = json!({
            "protocolVersion": self.config.protocol_version,
            "capabilities": {},
            "clientInfo": {
                "name": self.config.client_name,
                "version": self.config.client_version,
            }
        });
        let result = self.exchange(slot, "initialize", params).await?;

        if let Some(handle) = slot.as_mut() {
            let initialized = protocol::notification("notifications/initialized");
            if let Err(e) = Self::send(handle, &initialized).await {
                logging::debug(MODULE, &format!("initialized notification not delivered: {}", e));
            }
        }

        self.ready.store(true, Ordering::SeqCst);

        let server = result
            .pointer("/serverInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        self.logger
            .info(&format!("[ToolProcess] Connected to tool server '{}'", server));

        Ok(result)
    }

    async fn restart_locked(&self, slot: &mut Option<ProcessHandle>) -> RpcResult<()> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        self.logger
            .warn("[ToolProcess] Tool process went away, restarting");

        self.close_locked(slot).await;
        *slot = Some(self.spawn()?);
        self.handshake_locked(slot).await?;
        Ok(())
    }

    async fn close_locked(&self, slot: &mut Option<ProcessHandle>) {
        self.ready.store(false, Ordering::SeqCst);

        let Some(ProcessHandle {
            mut child,
            stdin,
            stdout,
        }) = slot.take()
        else {
            return;
        };

        drop(stdin);
        drop(stdout);

        if let Err(e) = child.start_kill() {
            logging::debug(MODULE, &format!("kill: {}", e));
        }
        match child.wait().await {
            Ok(status) => logging::debug(MODULE, &format!("Tool process exited: {}", status)),
            Err(e) => logging::warn(MODULE, &format!("Failed to reap tool process: {}", e)),
        }
    }

    /// One request, replayed once on a fresh process if the pipe is broken
    async fn request_with_restart(&self, method: &str, params: Value) -> RpcResult<Value> {
        let mut slot = self.process.lock().await;

        match self.exchange(&mut slot, method, params.clone()).await {
            Err(RpcError::ProcessBroken(reason)) => {
                logging::warn(MODULE, &format!("{} failed, pipe broken: {}", method, reason));
                if let Err(e) = self.restart_locked(&mut slot).await {
                    self.logger
                        .error(&format!("[ToolProcess] Restart failed: {}", e));
                    return Err(e);
                }
                self.exchange(&mut slot, method, params).await
            }
            other => other,
        }
    }

    async fn exchange(
        &self,
        slot: &mut Option<ProcessHandle>,
        method: &str,
        params: Value,
    ) -> RpcResult<Value> {
        let handle = slot.as_mut().ok_or(RpcError::NotRunning)?;
        let id = self.next_id();

        Self::send(handle, &protocol::request(id, method, params)).await?;
        let response = Self::receive(handle, id).await?;
        protocol::parse_response(response)
    }

    async fn send(handle: &mut ProcessHandle, message: &Value) -> RpcResult<()> {
        let mut line = serde_json::to_string(message)?;
        logging::debug(MODULE, &format!("--> {}", line));
        line.push('\n');

        let write = async {
            handle.stdin.write_all(line.as_bytes()).await?;
            handle.stdin.flush().await?;
            Ok::<(), io::Error>(())
        };

        write.await.map_err(|e| {
            if e.kind() == io::ErrorKind::BrokenPipe {
                RpcError::ProcessBroken(e.to_string())
            } else {
                logging::error(MODULE, &format!("Write failed: {}", e));
                RpcError::Io(e)
            }
        })
    }

    /// Read the next response line, skipping blank lines and server notifications
    async fn receive(handle: &mut ProcessHandle, id: u64) -> RpcResult<Value> {
        let mut line = String::new();
        loop {
            line.clear();
            if handle.stdout.read_line(&mut line).await? == 0 {
                logging::warn(MODULE, "Tool process closed stdout");
                return Err(RpcError::NoOutput);
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            logging::debug(MODULE, &format!("<-- {}", trimmed));

            let message: Value = serde_json::from_str(trimmed)?;
            if message.get("id").is_none() && message.get("method").is_some() {
                continue;
            }
            if message.get("id").and_then(Value::as_u64) != Some(id) {
                logging::debug(MODULE, &format!("Response id does not match request {}", id));
            }
            return Ok(message);
        }
    }
}

#[async_trait]
impl ToolBackend for ToolProcessClient {
    async fn initialize(&self) -> RpcResult<()> {
        ToolProcessClient::initialize(self).await
    }

    async fn list_tools(&self) -> RpcResult<Vec<ToolDescriptor>> {
        ToolProcessClient::list_tools(self).await
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolCallOutcome {
        ToolProcessClient::call_tool(self, name, arguments).await
    }

    async fn close(&self) {
        ToolProcessClient::close(self).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    const INIT_REPLY: &str = r#"{"jsonrpc":"2.0","id":0,"result":{"protocolVersion":"2024-11-05","serverInfo":{"name":"fake-excel","version":"0.1"}}}"#;

    /// Answers the protocol until stdin closes
    fn serve_loop() -> String {
        format!(
            r#"echo "fake server starting" >&2
while IFS= read -r line; do
  case "$line" in
    *'"notifications/'*) ;;
    *'"initialize"'*) echo '{init}' ;;
    *'"tools/list"'*) echo '{{"jsonrpc":"2.0","id":1,"result":{{"tools":[{{"name":"create_workbook","inputSchema":{{"type":"object"}}}},{{"name":"create_worksheet"}}]}}}}' ;;
    *'"fail_tool"'*) echo '{{"jsonrpc":"2.0","id":2,"result":{{"content":[{{"type":"text","text":"boom"}}],"isError":true}}}}' ;;
    *'"rpc_error_tool"'*) echo '{{"jsonrpc":"2.0","id":2,"error":{{"code":-32602,"message":"bad params"}}}}' ;;
    *'"echo_env"'*) printf '{{"jsonrpc":"2.0","id":2,"result":{{"content":[{{"type":"text","text":"%s"}}]}}}}\n' "$EXCEL_FILES_PATH" ;;
    *'"tools/call"'*) echo '{{"jsonrpc":"2.0","id":2,"result":{{"content":[{{"type":"text","text":"done"}}]}}}}' ;;
  esac
done
"#,
            init = INIT_REPLY
        )
    }

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn client_for(dir: &TempDir, script: &Path, extra_args: &[String]) -> ToolProcessClient {
        let mut args = vec![script.to_string_lossy().into_owned()];
        args.extend(extra_args.iter().cloned());
        let config = ToolProcessConfig::new("sh", args).with_workspace_root(dir.path());
        ToolProcessClient::new(config, Arc::new(NoOpLogger))
    }

    fn healthy_client(dir: &TempDir) -> ToolProcessClient {
        let script = write_script(dir.path(), "server.sh", &serve_loop());
        client_for(dir, &script, &[])
    }

    #[tokio::test]
    async fn test_call_before_initialize() {
        let dir = tempdir().unwrap();
        let client = healthy_client(&dir);

        let outcome = client.call_tool("create_workbook", Map::new()).await;
        assert_eq!(outcome, ToolCallOutcome::failure("Client not initialized"));
        assert!(matches!(client.list_tools().await, Err(RpcError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_initialize_list_and_call() {
        let dir = tempdir().unwrap();
        let client = healthy_client(&dir);

        client.initialize().await.unwrap();
        assert!(client.is_ready());

        let tools = client.list_tools().await.unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["create_workbook", "create_worksheet"]);

        let outcome = client.call_tool("create_worksheet", Map::new()).await;
        assert_eq!(outcome, ToolCallOutcome::success("done"));

        client.close().await;
        assert!(!client.is_ready());
        client.close().await;
    }

    #[tokio::test]
    async fn test_tool_error_and_rpc_error() {
        let dir = tempdir().unwrap();
        let client = healthy_client(&dir);
        client.initialize().await.unwrap();

        let outcome = client.call_tool("fail_tool", Map::new()).await;
        assert_eq!(outcome, ToolCallOutcome::failure("boom"));

        let outcome = client.call_tool("rpc_error_tool", Map::new()).await;
        assert_eq!(outcome, ToolCallOutcome::failure("bad params"));

        client.close().await;
    }

    #[tokio::test]
    async fn test_workspace_root_passed_in_env() {
        let dir = tempdir().unwrap();
        let client = healthy_client(&dir);
        client.initialize().await.unwrap();

        let outcome = client.call_tool("echo_env", Map::new()).await;
        assert!(outcome.ok);
        assert_eq!(outcome.text, dir.path().to_string_lossy());

        client.close().await;
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let config =
            ToolProcessConfig::new("/nonexistent/sheetsmith-tool-server", Vec::<String>::new());
        let client = ToolProcessClient::new(config, Arc::new(NoOpLogger));

        let err = client.initialize().await.unwrap_err();
        assert!(matches!(err, RpcError::Spawn { .. }));
        assert!(!client.is_ready());
    }

    #[tokio::test]
    async fn test_handshake_without_output() {
        let dir = tempdir().unwrap();
        let script = write_script(dir.path(), "mute.sh", "IFS= read -r line\nexit 0\n");
        let client = client_for(&dir, &script, &[]);

        let err = client.initialize().await.unwrap_err();
        assert!(matches!(err, RpcError::NoOutput));
        assert!(!client.is_ready());
    }

    #[tokio::test]
    async fn test_broken_pipe_restarts_once_and_replays() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("crashed-once");
        let body = format!(
            r#"if [ ! -f "$1" ]; then
  : > "$1"
  IFS= read -r line
  echo '{init}'
  exit 0
fi
{serve}"#,
            init = INIT_REPLY,
            serve = serve_loop()
        );
        let script = write_script(dir.path(), "flaky.sh", &body);
        let client = client_for(&dir, &script, &[marker.to_string_lossy().into_owned()]);

        client.initialize().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        let outcome = client.call_tool("create_worksheet", Map::new()).await;

        assert_eq!(outcome, ToolCallOutcome::success("done"));
        assert_eq!(client.restart_count(), 1);
        assert!(client.is_ready());

        client.close().await;
    }

    #[tokio::test]
    async fn test_failed_restart_surfaces_as_failure() {
        let dir = tempdir().unwrap();
        // Deletes itself, so the relaunch has nothing to run
        let body = format!("rm -f \"$0\"\nIFS= read -r line\necho '{}'\nexit 0\n", INIT_REPLY);
        let script = write_script(dir.path(), "once.sh", &body);
        let client = client_for(&dir, &script, &[]);

        client.initialize().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!script.exists());

        let outcome = client.call_tool("create_worksheet", Map::new()).await;

        assert!(!outcome.ok);
        assert_eq!(client.restart_count(), 1);
        assert!(!client.is_ready());

        client.close().await;
    }

    #[tokio::test]
    async fn test_second_break_surfaces_as_failure() {
        let dir = tempdir().unwrap();
        let body = format!("IFS= read -r line\necho '{}'\nexit 0\n", INIT_REPLY);
        let script = write_script(dir.path(), "dies.sh", &body);
        let client = client_for(&dir, &script, &[]);

        client.initialize().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        let outcome = client.call_tool("create_worksheet", Map::new()).await;

        assert!(!outcome.ok);
        assert_eq!(client.restart_count(), 1);

        client.close().await;
    }
}
