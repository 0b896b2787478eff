//! Public lobby listings.

use lobbyforge_protocol::{LobbyId, LobbyQuery, LobbySnapshot, QueryFilter, QueryOrder};
use lobbyforge_remote::LobbyService;
use lobbyforge_tick::{OperationKind, OperationLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::LobbyError;

/// Which public lobbies to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrowseFilter {
    /// Most recently created first.
    #[default]
    Newest,
    /// Only lobbies with a free seat.
    OpenSlots,
    /// Everything, in the directory's order.
    All,
}

impl BrowseFilter {
    fn query(self) -> LobbyQuery {
        match self {
            Self::Newest => LobbyQuery {
                filters: Vec::new(),
                order: vec![QueryOrder::CreatedDescending],
            },
            Self::OpenSlots => LobbyQuery {
                filters: vec![QueryFilter::AvailableSlotsGreaterThan(0)],
                order: Vec::new(),
            },
            Self::All => LobbyQuery::default(),
        }
    }
}

/// One row of a lobby listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySummary {
    pub id: LobbyId,
    pub name: String,
    pub player_count: usize,
    pub max_players: u32,
    pub has_password: bool,
}

impl From<&LobbySnapshot> for LobbySummary {
    fn from(snapshot: &LobbySnapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            name: snapshot.display_name().to_string(),
            player_count: snapshot.player_count(),
            max_players: snapshot.max_players,
            has_password: snapshot.has_password,
        }
    }
}

/// Lists joinable public lobbies.
///
/// Lobbies whose session is running and that will be destroyed afterwards
/// are left out, since joining them always fails.
pub struct LobbyBrowser<L: LobbyService> {
    service: L,
    query: OperationLock,
}

impl<L: LobbyService> LobbyBrowser<L> {
    pub fn new(service: L) -> Self {
        Self {
            service,
            query: OperationLock::new(OperationKind::Query),
        }
    }

    pub async fn browse(&self, filter: BrowseFilter) -> Result<Vec<LobbySummary>, LobbyError> {
        let Some(_guard) = self.query.try_acquire() else {
            debug!("lobby query already in flight");
            return Err(LobbyError::Busy(OperationKind::Query));
        };

        let lobbies = self
            .service
            .query_lobbies(&filter.query())
            .await
            .inspect_err(|e| warn!(error = %e, ?filter, "lobby query failed"))?;

        let rows: Vec<LobbySummary> = lobbies
            .iter()
            .filter(|lobby| !lobby.is_closed_session())
            .map(LobbySummary::from)
            .collect();
        debug!(?filter, found = lobbies.len(), listed = rows.len(), "lobbies listed");
        Ok(rows)
    }
}

/// Keeps the rows whose name matches `term` exactly. An empty term keeps
/// everything.
pub fn search(rows: &[LobbySummary], term: &str) -> Vec<LobbySummary> {
    let term = term.trim();
    rows.iter()
        .filter(|row| term.is_empty() || row.name == term)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str) -> LobbySummary {
        LobbySummary {
            id: LobbyId::new(format!("id-{name}")),
            name: name.to_string(),
            player_count: 1,
            max_players: 4,
            has_password: false,
        }
    }

    #[test]
    fn test_search_empty_term_keeps_all() {
        let rows = vec![row("Alpha"), row("Beta")];
        assert_eq!(search(&rows, "").len(), 2);
        assert_eq!(search(&rows, "  ").len(), 2);
    }

    #[test]
    fn test_search_exact_name_only() {
        let rows = vec![row("Alpha"), row("Alphabet")];
        let found = search(&rows, "Alpha");
        assert_eq!(found, vec![row("Alpha")]);
    }

    #[test]
    fn test_filter_queries() {
        assert_eq!(
            BrowseFilter::Newest.query().order,
            vec![QueryOrder::CreatedDescending]
        );
        assert_eq!(
            BrowseFilter::OpenSlots.query().filters,
            vec![QueryFilter::AvailableSlotsGreaterThan(0)]
        );
        assert_eq!(BrowseFilter::All.query(), LobbyQuery::default());
    }
}
