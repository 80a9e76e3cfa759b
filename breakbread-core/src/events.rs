use crossbeam::channel::{Receiver, Sender};

use crate::{PlaceData, ProfileData, RecordId, TableData, TableMemberData};

pub type EventSender = Sender<ClientEvent>;
pub type EventReceiver = Receiver<ClientEvent>;

/// Events emitted by the client as local state reconciles with the backend
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The authoritative table list was refetched
    TablesUpdated { tables: Vec<TableData> },
    /// A table was created by the current user
    TableCreated { table: TableData },
    /// A table was deleted by its creator
    TableDeleted { table_id: RecordId },
    /// The current user joined a table
    MemberJoined {
        table_id: RecordId,
        member: TableMemberData,
    },
    /// The current user left a table
    MemberLeft {
        table_id: RecordId,
        user_id: RecordId,
    },
    /// The current user's profile changed
    ProfileUpdated { profile: ProfileData },
    /// The signed-in user changed
    SessionChanged { user_id: Option<RecordId> },
    /// A search query resolved with fresh results
    SearchResults { places: Vec<PlaceData> },
    /// A search query failed; any previous results were cleared
    SearchFailed { message: String },
}
