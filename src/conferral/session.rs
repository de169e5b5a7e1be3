//! Conferral session: pairs ledger reservation with conferred-item
//! persistence

use bigdecimal::BigDecimal;
use tracing::debug;
use uuid::Uuid;

use crate::conferral::DedupLedger;
use crate::matching::ValueMatcher;
use crate::traits::ConferralStore;
use crate::types::*;

/// Outcome of conferring a typed value against a record set
#[derive(Debug, Clone, PartialEq)]
pub enum ConferOutcome {
    /// Exactly one record matched and was confirmed
    Conferred(ConferredItem),
    /// No unreserved record matched; recorded to the audit trail
    NotFound {
        /// The parsed query amount
        query: BigDecimal,
    },
    /// Several records matched; the operator must pick one and call
    /// [`ConferralSession::confirm`]
    Ambiguous {
        /// The parsed query amount
        query: BigDecimal,
        /// Candidates in their original order
        candidates: Vec<Record>,
    },
}

/// Orchestrates the confer workflow for one operator session.
///
/// The session is constructed explicitly and owns its ledger, so separate
/// sessions never share reservation state unless a ledger handle is passed
/// in deliberately. Every mutation keeps the dedup invariant: a record key
/// is reserved iff exactly one live [`ConferredItem`] references it.
pub struct ConferralSession<S: ConferralStore> {
    store: S,
    ledger: DedupLedger,
    matcher: ValueMatcher,
}

impl<S: ConferralStore> ConferralSession<S> {
    /// Create a session with a fresh ledger
    pub fn new(store: S) -> Self {
        Self::with_ledger(store, DedupLedger::new())
    }

    /// Create a session sharing an existing ledger handle
    pub fn with_ledger(store: S, ledger: DedupLedger) -> Self {
        Self {
            store,
            ledger,
            matcher: ValueMatcher::new(),
        }
    }

    /// The session's ledger handle
    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    /// Confer a typed value against the record set.
    ///
    /// Zero candidates persist a not-found event; exactly one candidate is
    /// confirmed automatically; several candidates are returned for the
    /// operator to disambiguate, with nothing reserved.
    pub async fn confer_value(
        &mut self,
        query_text: &str,
        records: &[Record],
    ) -> MatchResult<ConferOutcome> {
        let search = self.matcher.search(query_text, records, &self.ledger)?;

        match search.matches.len() {
            0 => {
                self.store
                    .append_event(&ConferEvent::not_found(search.query.clone()))
                    .await?;
                debug!(query = %search.query, "confer value found no candidates");
                Ok(ConferOutcome::NotFound {
                    query: search.query,
                })
            }
            1 => {
                let record = search.matches[0].clone();
                let item = self.confirm(&record).await?;
                Ok(ConferOutcome::Conferred(item))
            }
            _ => Ok(ConferOutcome::Ambiguous {
                query: search.query,
                candidates: search.matches,
            }),
        }
    }

    /// Confirm a specific record, reserving its key.
    ///
    /// Of two racing confirmations of the same record, exactly one
    /// succeeds; the loser gets [`MatchError::AlreadyConferred`], which is
    /// distinct from "no match" so the operator sees the real cause.
    pub async fn confirm(&mut self, record: &Record) -> MatchResult<ConferredItem> {
        let key = record.key();

        if !self.ledger.reserve(&key) {
            self.store
                .append_event(&ConferEvent::already_conferred(record))
                .await?;
            return Err(MatchError::AlreadyConferred(key));
        }

        let item = ConferredItem::new(record.clone());

        // Reservation and persistence must land together; back out the
        // reservation if the store rejects the item.
        if let Err(error) = self.store.save_conferred_item(&item).await {
            self.ledger.release(&key);
            return Err(error);
        }
        if let Err(error) = self.store.append_event(&ConferEvent::matched(record)).await {
            self.store.delete_conferred_item(item.conferred_id).await?;
            self.ledger.release(&key);
            return Err(error);
        }

        debug!(key = %key, conferred_id = %item.conferred_id, "record conferred");
        Ok(item)
    }

    /// Undo a confirmation, releasing the record back to the unmatched
    /// pool. Returns the released record.
    pub async fn undo(&mut self, conferred_id: Uuid) -> MatchResult<Record> {
        let item = self
            .store
            .get_conferred_item(conferred_id)
            .await?
            .ok_or(MatchError::ConferralNotFound(conferred_id))?;

        self.store.delete_conferred_item(conferred_id).await?;
        self.ledger.release(&item.record.key());

        debug!(key = %item.record.key(), %conferred_id, "conferral undone");
        Ok(item.record)
    }

    /// All live conferred items
    pub async fn conferred_items(&self) -> MatchResult<Vec<ConferredItem>> {
        self.store.list_conferred_items().await
    }

    /// All audit events recorded so far
    pub async fn events(&self) -> MatchResult<Vec<ConferEvent>> {
        self.store.list_events().await
    }
}
