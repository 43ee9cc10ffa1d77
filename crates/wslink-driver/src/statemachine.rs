//! The "what does the console want from me now" decision.
//!
//! Pure and total: every (response, pending) pair maps to exactly one next
//! request. The service loop owns all the state; this module only decides.

use wslink_ws28xx_protocol::history::HistoryIndex;
use wslink_ws28xx_protocol::ResponseType;

/// Outstanding writes the facade has queued, snapshotted per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pending {
    /// A SendTime is waiting for its slot.
    pub set_time: bool,
    /// A config write is waiting for its slot.
    pub set_config: bool,
    /// History caching is active with records still to drain.
    pub history_catchup: bool,
    /// The console's config differs from the pending image (set on Config
    /// responses by the service loop).
    pub config_differs: bool,
}

/// Progress markers a History response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryProgress {
    /// The drain has reached the console's newest record.
    pub caught_up: bool,
    /// Slot to request next.
    pub next: HistoryIndex,
}

/// What to transmit in the console's next listen window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextRequest {
    /// Request a current-weather frame.
    GetCurrent,
    /// Request the archive record at this slot.
    GetHistory(HistoryIndex),
    /// Request the console configuration.
    GetConfig,
    /// Announce that a SetConfig body is ready.
    AnnounceSetConfig,
    /// Transmit the full SetConfig body.
    SetConfigBody,
    /// Transmit the host clock.
    SendTime,
}

/// Select the next request for a received response type.
///
/// `history` carries the ring progress for History responses and the
/// driver's current next-slot marker otherwise.
pub fn next_request(
    response: ResponseType,
    pending: Pending,
    history: HistoryProgress,
) -> NextRequest {
    match response {
        ResponseType::Current => {
            if pending.set_time {
                NextRequest::SendTime
            } else if pending.set_config {
                NextRequest::AnnounceSetConfig
            } else if pending.history_catchup {
                NextRequest::GetHistory(history.next)
            } else {
                NextRequest::GetCurrent
            }
        }
        ResponseType::History => {
            if history.caught_up {
                NextRequest::GetCurrent
            } else {
                NextRequest::GetHistory(history.next)
            }
        }
        ResponseType::Config => {
            if pending.config_differs {
                NextRequest::AnnounceSetConfig
            } else {
                NextRequest::GetCurrent
            }
        }
        ResponseType::RequestSetConfig | ResponseType::RequestFirstConfig => {
            NextRequest::SetConfigBody
        }
        ResponseType::RequestSetTime => NextRequest::SendTime,
        ResponseType::Ack => NextRequest::GetCurrent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_RESPONSES: [ResponseType; 7] = [
        ResponseType::Ack,
        ResponseType::Config,
        ResponseType::Current,
        ResponseType::History,
        ResponseType::RequestFirstConfig,
        ResponseType::RequestSetConfig,
        ResponseType::RequestSetTime,
    ];

    fn progress(caught_up: bool) -> HistoryProgress {
        HistoryProgress {
            caught_up,
            next: HistoryIndex(7),
        }
    }

    #[test]
    fn test_current_priorities() {
        let p = Pending {
            set_time: true,
            set_config: true,
            history_catchup: true,
            config_differs: false,
        };
        // Time first, then config, then history, then current.
        assert_eq!(
            next_request(ResponseType::Current, p, progress(false)),
            NextRequest::SendTime
        );
        let p = Pending { set_time: false, ..p };
        assert_eq!(
            next_request(ResponseType::Current, p, progress(false)),
            NextRequest::AnnounceSetConfig
        );
        let p = Pending { set_config: false, ..p };
        assert_eq!(
            next_request(ResponseType::Current, p, progress(false)),
            NextRequest::GetHistory(HistoryIndex(7))
        );
        let p = Pending { history_catchup: false, ..p };
        assert_eq!(
            next_request(ResponseType::Current, p, progress(false)),
            NextRequest::GetCurrent
        );
    }

    #[test]
    fn test_history_follows_ring() {
        assert_eq!(
            next_request(ResponseType::History, Pending::default(), progress(true)),
            NextRequest::GetCurrent
        );
        assert_eq!(
            next_request(ResponseType::History, Pending::default(), progress(false)),
            NextRequest::GetHistory(HistoryIndex(7))
        );
    }

    #[test]
    fn test_config_pushes_when_stale() {
        let differs = Pending {
            config_differs: true,
            ..Pending::default()
        };
        assert_eq!(
            next_request(ResponseType::Config, differs, progress(true)),
            NextRequest::AnnounceSetConfig
        );
        assert_eq!(
            next_request(ResponseType::Config, Pending::default(), progress(true)),
            NextRequest::GetCurrent
        );
    }

    #[test]
    fn test_console_requests_are_answered_directly() {
        assert_eq!(
            next_request(
                ResponseType::RequestSetTime,
                Pending::default(),
                progress(true)
            ),
            NextRequest::SendTime
        );
        assert_eq!(
            next_request(
                ResponseType::RequestSetConfig,
                Pending::default(),
                progress(true)
            ),
            NextRequest::SetConfigBody
        );
        assert_eq!(
            next_request(ResponseType::Ack, Pending::default(), progress(true)),
            NextRequest::GetCurrent
        );
    }

    /// Totality: every combination selects exactly one request without
    /// panicking.
    #[test]
    fn test_total_over_all_inputs() {
        for response in ALL_RESPONSES {
            for bits in 0u8..16 {
                let pending = Pending {
                    set_time: bits & 1 != 0,
                    set_config: bits & 2 != 0,
                    history_catchup: bits & 4 != 0,
                    config_differs: bits & 8 != 0,
                };
                for caught_up in [false, true] {
                    let _ = next_request(response, pending, progress(caught_up));
                }
            }
        }
    }
}
