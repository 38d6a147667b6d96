//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific command type.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::OrderEvent;

mod create_order;
mod set_payment_status;
mod transition_status;

pub use create_order::CreateOrderAction;
pub use set_payment_status::SetPaymentStatusAction;
pub use transition_status::TransitionStatusAction;

/// CommandAction enum - dispatches to concrete action implementations
#[derive(Debug, Clone)]
pub enum CommandAction {
    CreateOrder(CreateOrderAction),
    TransitionStatus(TransitionStatusAction),
    SetPaymentStatus(SetPaymentStatusAction),
}

impl CommandAction {
    /// Order the command targets
    pub fn order_id(&self) -> &str {
        match self {
            CommandAction::CreateOrder(action) => &action.order_id,
            CommandAction::TransitionStatus(action) => &action.order_id,
            CommandAction::SetPaymentStatus(action) => &action.order_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommandAction::CreateOrder(_) => "create_order",
            CommandAction::TransitionStatus(_) => "transition_status",
            CommandAction::SetPaymentStatus(_) => "set_payment_status",
        }
    }
}

/// Manual implementation of CommandHandler for CommandAction
#[async_trait]
impl CommandHandler for CommandAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        match self {
            CommandAction::CreateOrder(action) => action.execute(ctx, metadata).await,
            CommandAction::TransitionStatus(action) => action.execute(ctx, metadata).await,
            CommandAction::SetPaymentStatus(action) => action.execute(ctx, metadata).await,
        }
    }
}

impl From<CreateOrderAction> for CommandAction {
    fn from(action: CreateOrderAction) -> Self {
        CommandAction::CreateOrder(action)
    }
}

impl From<TransitionStatusAction> for CommandAction {
    fn from(action: TransitionStatusAction) -> Self {
        CommandAction::TransitionStatus(action)
    }
}

impl From<SetPaymentStatusAction> for CommandAction {
    fn from(action: SetPaymentStatusAction) -> Self {
        CommandAction::SetPaymentStatus(action)
    }
}
