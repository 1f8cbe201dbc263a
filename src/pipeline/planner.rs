use crate::error::InvokeError;
use crate::invoke::StructuredInvoker;
use tracing::info;

use super::context::PipelineContext;
use super::contracts::PlanContract;
use super::prompts;
use super::types::{GenerationRequest, PlanItem};

/// Produce the ordered plan for `request`; any failure is fatal to the run
pub async fn plan(
    invoker: &StructuredInvoker<'_>,
    ctx: &PipelineContext,
    request: &GenerationRequest,
) -> Result<Vec<PlanItem>, InvokeError> {
    let prompt = prompts::plan_prompt(ctx, request);
    let tags = vec!["stage:planner".to_string()];

    let PlanContract(mut items) = invoker
        .invoke::<PlanContract>(&ctx.planner, &prompt, Some(prompts::PLAN_RETRY), &tags)
        .await?;

    assign_plan_ids(&mut items);
    info!("Planner produced {} plan items", items.len());
    Ok(items)
}

/// Items without an id become `PLAN-<position>`
pub fn assign_plan_ids(items: &mut [PlanItem]) {
    for (idx, item) in items.iter_mut().enumerate() {
        if item.id.trim().is_empty() {
            item.id = format!("PLAN-{}", idx + 1);
        } else {
            item.id = item.id.trim().to_string();
        }
    }
}
