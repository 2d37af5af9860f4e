use serde::Deserialize;

/// Page size fixed by the directory contract; every request asks for
/// exactly this many members.
pub const PAGE_LIMIT: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub role: String,
    pub email: String,
    pub is_active: bool,
}

/// One successfully fetched page, already past the `success` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterPage {
    pub members: Vec<Member>,
    pub page: usize,
    pub total_pages: usize,
}

/// Wire envelope returned by the directory endpoint.
///
/// `totalPages` counts unfiltered members while the client drops inactive
/// ones after every fetch, so page math and visible counts can disagree.
#[derive(Debug, Deserialize)]
pub(crate) struct DirectoryReply {
    pub(crate) success: bool,
    #[serde(default)]
    pub(crate) data: Vec<Member>,
    pub(crate) pagination: PaginationMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaginationMeta {
    pub(crate) page: usize,
    pub(crate) total_pages: usize,
}

#[cfg(test)]
mod tests {
    use super::{DirectoryReply, Member};

    #[test]
    fn member_deserializes_from_camel_case_wire_shape() {
        let member: Member = serde_json::from_str(
            r#"{"id":"u-7","name":"Riley Chen","role":"engineer","email":"riley@example.com","isActive":true}"#,
        )
        .expect("member should deserialize");
        assert_eq!(member.id, "u-7");
        assert!(member.is_active);
    }

    #[test]
    fn reply_tolerates_missing_data_but_not_missing_pagination() {
        let reply: DirectoryReply =
            serde_json::from_str(r#"{"success":true,"pagination":{"page":1,"totalPages":3}}"#)
                .expect("reply without data should deserialize");
        assert!(reply.success);
        assert!(reply.data.is_empty());
        assert_eq!(reply.pagination.total_pages, 3);

        let malformed = serde_json::from_str::<DirectoryReply>(r#"{"success":true,"data":[]}"#);
        assert!(malformed.is_err());
    }
}
