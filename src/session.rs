use chrono::Utc;

use crate::api::ApiClient;
use crate::error::SessionError;
use crate::marker;
use crate::models::{
    Citation, ChunkResponse, DocumentHandle, Message, QueryResponse, RecentCitation, Role,
    SelectedChunk, UploadResponse,
};
use crate::recent::{self, RecentCitations};

/// A ticket issued when a query is submitted. Carries the session epoch it
/// was issued under and the seq id of the optimistically appended user
/// message, so the completion can be matched back or discarded as stale.
#[derive(Debug, Clone, Copy)]
pub struct QueryTicket {
    epoch: u64,
    seq: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct UploadTicket {
    epoch: u64,
}

/// Owns the conversation: document presence, the append-only message log,
/// the recency cache, and the chunk currently opened from a citation.
///
/// The upload, query, and reset lifecycles are split into `begin_*` and
/// `complete_*` halves. `begin_*` validates guards and applies the optimistic
/// effect; `complete_*` applies the external outcome. The async methods
/// (`upload`, `ask`, `reset`, `open_citation`) wire the two halves to the
/// backend client; an event-driven caller can drive the halves directly and
/// interleave them however its event loop resolves.
pub struct SessionController {
    api: ApiClient,
    document: Option<DocumentHandle>,
    messages: Vec<Message>,
    recent: RecentCitations,
    selected: Option<SelectedChunk>,
    epoch: u64,
    next_seq: u64,
    upload_in_flight: bool,
    query_in_flight: bool,
    reset_in_flight: bool,
}

impl SessionController {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            document: None,
            messages: Vec::new(),
            recent: RecentCitations::new(),
            selected: None,
            epoch: 0,
            next_seq: 0,
            upload_in_flight: false,
            query_in_flight: false,
            reset_in_flight: false,
        }
    }

    pub async fn upload(
        &mut self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Option<DocumentHandle>, SessionError> {
        let ticket = self.begin_upload()?;
        let result = self.api.upload_document(filename, bytes).await;
        self.complete_upload(ticket, result)
    }

    pub async fn ask(&mut self, question: &str) -> Result<Option<Message>, SessionError> {
        let ticket = self.begin_query(question)?;
        let result = self.api.submit_query(question).await;
        self.complete_query(ticket, result)
    }

    pub async fn reset(&mut self) -> Result<(), SessionError> {
        self.begin_reset()?;
        let result = self.api.reset().await;
        self.complete_reset(result)
    }

    /// Opens the full chunk text behind a citation. Independent of the
    /// query/upload lifecycles; a failed lookup leaves any previously opened
    /// chunk in place.
    pub async fn open_citation(&mut self, chunk_id: u32) -> Result<&SelectedChunk, SessionError> {
        let result = self.api.fetch_chunk(chunk_id).await;
        self.apply_chunk_lookup(result)
    }

    pub fn dismiss_chunk(&mut self) {
        self.selected = None;
    }

    pub fn begin_upload(&mut self) -> Result<UploadTicket, SessionError> {
        if self.reset_in_flight {
            return Err(SessionError::ResetInFlight);
        }
        if self.upload_in_flight {
            return Err(SessionError::UploadInFlight);
        }
        if self.query_in_flight {
            return Err(SessionError::QueryInFlight);
        }

        self.upload_in_flight = true;
        Ok(UploadTicket { epoch: self.epoch })
    }

    /// A failed upload leaves the current document (if any) in place. A
    /// successful re-upload replaces the document but keeps the message log;
    /// the new document only changes what subsequent queries run against.
    pub fn complete_upload(
        &mut self,
        ticket: UploadTicket,
        result: anyhow::Result<UploadResponse>,
    ) -> Result<Option<DocumentHandle>, SessionError> {
        if ticket.epoch != self.epoch || !self.upload_in_flight {
            return Ok(None);
        }

        self.upload_in_flight = false;

        let response = match result {
            Ok(response) => response,
            Err(err) => return Err(SessionError::UploadFailed(err.to_string())),
        };

        let handle = DocumentHandle {
            name: response.filename,
            page_count: response.pages,
            chunk_count: response.chunks,
            uploaded_at: Utc::now(),
        };
        tracing::info!(
            "document {} indexed ({} pages, {} chunks)",
            handle.name,
            handle.page_count,
            handle.chunk_count
        );
        self.document = Some(handle.clone());
        Ok(Some(handle))
    }

    /// Appends the user's message immediately, before the backend answers.
    pub fn begin_query(&mut self, text: &str) -> Result<QueryTicket, SessionError> {
        if self.reset_in_flight {
            return Err(SessionError::ResetInFlight);
        }
        if self.upload_in_flight {
            return Err(SessionError::UploadInFlight);
        }
        if self.query_in_flight {
            return Err(SessionError::QueryInFlight);
        }
        if self.document.is_none() {
            return Err(SessionError::NoDocument);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.messages.push(Message {
            seq,
            role: Role::User,
            content: text.to_string(),
            citations: None,
        });
        self.query_in_flight = true;

        Ok(QueryTicket {
            epoch: self.epoch,
            seq,
        })
    }

    /// On success, appends the assistant message (citations extracted from
    /// the answer text) and offers the response's first chunks to the recency
    /// cache in the same step. On failure, rolls back exactly the user
    /// message this ticket appended. A ticket from a superseded epoch is
    /// discarded wholesale and `Ok(None)` returned.
    pub fn complete_query(
        &mut self,
        ticket: QueryTicket,
        result: anyhow::Result<QueryResponse>,
    ) -> Result<Option<Message>, SessionError> {
        if ticket.epoch != self.epoch {
            tracing::debug!(
                "discarding query completion from epoch {} (current {})",
                ticket.epoch,
                self.epoch
            );
            return Ok(None);
        }
        if !self.query_in_flight {
            return Ok(None);
        }

        self.query_in_flight = false;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                if let Some(pos) = self.messages.iter().position(|m| m.seq == ticket.seq) {
                    self.messages.remove(pos);
                }
                return Err(SessionError::QueryFailed(err.to_string()));
            }
        };

        let QueryResponse { answer, chunks } = response;
        let extracted = marker::extract_citations(&answer);
        let seq = self.next_seq;
        self.next_seq += 1;
        let message = Message {
            seq,
            role: Role::Assistant,
            content: answer,
            citations: if extracted.is_empty() {
                None
            } else {
                Some(extracted)
            },
        };
        self.messages.push(message.clone());

        self.recent.offer(chunks.into_iter().map(|chunk| RecentCitation {
            citation: Citation {
                page: chunk.page,
                chunk_id: chunk.chunk_id,
            },
            snippet: recent::snippet(&chunk.text),
        }));

        Ok(Some(message))
    }

    pub fn begin_reset(&mut self) -> Result<(), SessionError> {
        if self.reset_in_flight {
            return Err(SessionError::ResetInFlight);
        }
        if self.upload_in_flight {
            return Err(SessionError::UploadInFlight);
        }

        self.reset_in_flight = true;
        Ok(())
    }

    /// Clearing happens only once the backend confirms: document, log,
    /// recency cache, and any open chunk all go together, and the epoch is
    /// bumped so an outstanding query from before the reset cannot land.
    /// On failure nothing is cleared.
    pub fn complete_reset(&mut self, result: anyhow::Result<()>) -> Result<(), SessionError> {
        if !self.reset_in_flight {
            return Ok(());
        }

        self.reset_in_flight = false;

        if let Err(err) = result {
            return Err(SessionError::ResetFailed(err.to_string()));
        }

        self.document = None;
        self.messages.clear();
        self.recent.clear();
        self.selected = None;
        self.query_in_flight = false;
        self.epoch += 1;
        tracing::info!("session cleared");
        Ok(())
    }

    fn apply_chunk_lookup(
        &mut self,
        result: anyhow::Result<ChunkResponse>,
    ) -> Result<&SelectedChunk, SessionError> {
        match result {
            Ok(chunk) => Ok(self.selected.insert(SelectedChunk {
                page: chunk.page,
                chunk_id: chunk.chunk_id,
                text: chunk.text,
            })),
            Err(err) => Err(SessionError::ChunkFetchFailed(err.to_string())),
        }
    }

    pub fn document(&self) -> Option<&DocumentHandle> {
        self.document.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn recent(&self) -> &[RecentCitation] {
        self.recent.snapshot()
    }

    pub fn selected_chunk(&self) -> Option<&SelectedChunk> {
        self.selected.as_ref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_uploading(&self) -> bool {
        self.upload_in_flight
    }

    pub fn is_querying(&self) -> bool {
        self.query_in_flight
    }
}
