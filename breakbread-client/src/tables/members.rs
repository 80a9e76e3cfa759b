use chrono::{DateTime, Utc};

use breakbread_core::{RecordId, TableData, TableMemberData};

/// A roster row ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct MemberView {
    pub user_id: RecordId,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
    /// Rendered first and flagged distinctly
    pub is_creator: bool,
}

/// Assembles the display roster for a table.
///
/// The creator is always present even without an explicit membership row,
/// and any duplicate membership row for them is dropped.
pub fn assemble_roster(
    table: &TableData,
    creator_name: Option<String>,
    members: Vec<TableMemberData>,
) -> Vec<MemberView> {
    let creator = MemberView {
        user_id: table.creator_id.clone(),
        display_name: creator_name.unwrap_or_else(|| "Table Creator".to_string()),
        joined_at: table.created_at,
        is_creator: true,
    };

    let mut roster = vec![creator];

    roster.extend(
        members
            .into_iter()
            .filter(|member| member.user_id != table.creator_id)
            .map(|member| MemberView {
                display_name: member
                    .username
                    .clone()
                    .unwrap_or_else(|| member.user_id.clone()),
                user_id: member.user_id,
                joined_at: member.joined_at,
                is_creator: false,
            }),
    );

    roster
}
