//! Thread-safe pool of tree-sitter parsers.
//!
//! Tree-sitter parsers are not `Send`/`Sync`, so each worker thread owns one
//! and receives requests over a channel — the same workaround the teacher
//! used, kept nearly as-is.

use std::path::PathBuf;

use anyhow::Result;
use tree_sitter::{Language, Parser};

/// Languages this pool can hand a tree-sitter grammar for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Rust,
    TypeScript,
    JavaScript,
    Python,
    Go,
    Java,
}

impl FileType {
    pub fn from_path(path: &PathBuf) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "rs" => Some(FileType::Rust),
            "ts" | "tsx" => Some(FileType::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(FileType::JavaScript),
            "py" | "pyi" => Some(FileType::Python),
            "go" => Some(FileType::Go),
            "java" => Some(FileType::Java),
            _ => None,
        }
    }

    pub fn get_language(&self) -> Language {
        match self {
            FileType::Rust => tree_sitter_rust::LANGUAGE.into(),
            FileType::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            FileType::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            FileType::Python => tree_sitter_python::LANGUAGE.into(),
            FileType::Go => tree_sitter_go::LANGUAGE.into(),
            FileType::Java => tree_sitter_java::LANGUAGE.into(),
        }
    }
}

#[derive(Debug)]
pub struct ParseRequest {
    pub file_type: FileType,
    pub content: String,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct ParseResult {
    pub tree: tree_sitter::Tree,
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug)]
struct WorkerRequest {
    request: ParseRequest,
    response_sender: std::sync::mpsc::Sender<Result<ParseResult>>,
}

/// A fixed-size pool of worker threads, each owning one `tree_sitter::Parser`.
pub struct ParserPool {
    sender: std::sync::mpsc::Sender<WorkerRequest>,
}

impl ParserPool {
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = std::sync::mpsc::channel::<WorkerRequest>();
        let receiver = std::sync::Arc::new(std::sync::Mutex::new(receiver));

        for i in 0..num_workers {
            let receiver = receiver.clone();
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender }
    }

    fn worker_thread(
        worker_id: usize,
        receiver: std::sync::Arc<std::sync::Mutex<std::sync::mpsc::Receiver<WorkerRequest>>>,
    ) {
        tracing::debug!(worker_id, "parser worker started");

        let mut parser = Parser::new();

        loop {
            let request = match receiver.lock().unwrap().recv() {
                Ok(req) => req,
                Err(_) => {
                    tracing::debug!(worker_id, "parser worker shutting down");
                    break;
                }
            };

            let WorkerRequest { request, response_sender } = request;

            let language = request.file_type.get_language();
            if let Err(e) = parser.set_language(&language) {
                let _ = response_sender.send(Err(anyhow::anyhow!("failed to set language: {e}")));
                continue;
            }

            let result = match parser.parse(&request.content, None) {
                Some(tree) => Ok(ParseResult {
                    tree,
                    path: request.path,
                    content: request.content,
                }),
                None => Err(anyhow::anyhow!("failed to parse content")),
            };

            if response_sender.send(result).is_err() {
                tracing::warn!("failed to send parse result back to caller");
            }
        }
    }

    /// Parse synchronously; blocks the current thread until a worker replies.
    pub fn parse_blocking(&self, request: ParseRequest) -> Result<ParseResult> {
        let (response_sender, response_receiver) = std::sync::mpsc::channel();
        let worker_request = WorkerRequest { request, response_sender };

        self.sender
            .send(worker_request)
            .map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;

        response_receiver
            .recv()
            .map_err(|_| anyhow::anyhow!("parser worker died"))?
    }

    /// Parse asynchronously, offloading the blocking recv onto a blocking task.
    pub async fn parse(&self, request: ParseRequest) -> Result<ParseResult> {
        let sender = self.sender.clone();
        tokio::task::spawn_blocking(move || {
            let (response_sender, response_receiver) = std::sync::mpsc::channel();
            let worker_request = WorkerRequest { request, response_sender };

            sender
                .send(worker_request)
                .map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;

            response_receiver
                .recv()
                .map_err(|_| anyhow::anyhow!("parser worker died"))?
        })
        .await
        .map_err(|e| anyhow::anyhow!("task join error: {e}"))?
    }
}

impl Clone for ParserPool {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

/// One worker per available core, minimum 2.
pub fn create_parser_pool() -> ParserPool {
    let num_workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);
    ParserPool::new(num_workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_rust_source() {
        let pool = create_parser_pool();
        let request = ParseRequest {
            file_type: FileType::Rust,
            content: "fn main() {}".to_string(),
            path: PathBuf::from("test.rs"),
        };
        let result = pool.parse(request).await.unwrap();
        assert_eq!(result.tree.root_node().kind(), "source_file");
    }

    #[tokio::test]
    async fn parses_typescript_source() {
        let pool = create_parser_pool();
        let request = ParseRequest {
            file_type: FileType::TypeScript,
            content: "class A { method() {} }".to_string(),
            path: PathBuf::from("test.ts"),
        };
        let result = pool.parse(request).await.unwrap();
        assert_eq!(result.tree.root_node().kind(), "program");
    }
}
