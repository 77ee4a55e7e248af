use axum::Json;

use points_types::models::PointAction;

/// Point actions an admin can apply with one click.
pub const POINT_ACTIONS: &[PointAction] = &[
    PointAction {
        label: "Joined Discord",
        amount: 20,
        padded: true,
    },
    PointAction {
        label: "Referred Friend (Joined Server)",
        amount: 50,
        padded: true,
    },
    PointAction {
        label: "Referred Friend (Got SGT)",
        amount: 100,
        padded: true,
    },
    PointAction {
        label: "Redeemed $10 Reward",
        amount: -250,
        padded: false,
    },
    PointAction {
        label: "Redeemed $5 Steam Giftcard",
        amount: -250,
        padded: false,
    },
];

pub fn find_action(label: &str) -> Option<&'static PointAction> {
    POINT_ACTIONS.iter().find(|a| a.label == label)
}

pub async fn list_actions() -> Json<&'static [PointAction]> {
    Json(POINT_ACTIONS)
}
