use crate::types::Revision;

/// Identifies one in-flight request and the store revision it was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    revision: Revision,
}

impl Ticket {
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Handle for the JS boundary. Only the sequence number crosses; the
    /// revision stays with the issuing `LatestOnly` and is never truncated.
    pub fn to_bits(self) -> u64 {
        self.seq
    }
}

/// Accepts only the response to the most recent request, and only while the
/// selection that triggered it is still current.
#[derive(Debug, Default)]
pub struct LatestOnly {
    next_seq: u64,
    latest: Option<Ticket>,
}

impl LatestOnly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request for `revision`, superseding any earlier one.
    pub fn issue(&mut self, revision: Revision) -> Ticket {
        self.next_seq += 1;
        let ticket = Ticket {
            seq: self.next_seq,
            revision,
        };
        self.latest = Some(ticket);
        ticket
    }

    pub fn is_current(&self, ticket: Ticket, current: Revision) -> bool {
        self.latest == Some(ticket) && ticket.revision == current
    }

    /// Hand back `value` if the ticket is still current, else discard it.
    pub fn complete<T>(&mut self, ticket: Ticket, current: Revision, value: T) -> Option<T> {
        if !self.is_current(ticket, current) {
            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "stale_response",
                ticket_revision = ticket.revision.0,
                current_revision = current.0,
            );
            return None;
        }
        self.latest = None;
        Some(value)
    }

    /// Look up the outstanding ticket from its handle. Handles of superseded
    /// or completed tickets find nothing.
    pub fn find(&self, bits: u64) -> Option<Ticket> {
        self.latest.filter(|t| t.to_bits() == bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_request_supersedes_older() {
        let mut latest = LatestOnly::new();
        let first = latest.issue(Revision(1));
        let second = latest.issue(Revision(2));

        assert_eq!(latest.complete(first, Revision(2), "old"), None);
        assert_eq!(latest.complete(second, Revision(2), "new"), Some("new"));
    }

    #[test]
    fn response_for_superseded_selection_is_discarded() {
        let mut latest = LatestOnly::new();
        let ticket = latest.issue(Revision(5));
        // Selection moved on before the response arrived
        assert_eq!(latest.complete(ticket, Revision(6), 42), None);
    }

    #[test]
    fn ticket_completes_once() {
        let mut latest = LatestOnly::new();
        let ticket = latest.issue(Revision(1));
        assert_eq!(latest.complete(ticket, Revision(1), 1), Some(1));
        assert_eq!(latest.complete(ticket, Revision(1), 2), None);
    }

    #[test]
    fn packed_ticket_round_trips() {
        let mut latest = LatestOnly::new();
        let ticket = latest.issue(Revision(9));
        assert_eq!(latest.find(ticket.to_bits()), Some(ticket));
        assert_eq!(latest.find(ticket.to_bits() + 1), None);
    }

    #[test]
    fn handle_keeps_revisions_past_32_bits() {
        let mut latest = LatestOnly::new();
        let high = Revision((1 << 32) + 7);
        let first = latest.issue(high);
        let second = latest.issue(high);
        assert_ne!(first.to_bits(), second.to_bits());
        assert_eq!(latest.find(first.to_bits()), None);

        let found = latest.find(second.to_bits()).unwrap();
        assert_eq!(found.revision(), high);
        // Same low 32 bits, different revision
        assert_eq!(latest.complete(found, Revision(7), ()), None);
        assert_eq!(latest.complete(found, high, ()), Some(()));
    }
}
