use crate::domain::model::route::{ReroutingType, Route, Step};
use crate::domain::model::transport_order::DriveOrder;
use crate::domain::model::vehicle::Vehicle;
use crate::domain::routing::route_provider::RouteProvider;

/// Stitches a freshly computed route onto the drive order a vehicle is
/// currently executing, preserving already-earned progress.
pub trait DriveOrderMergeStrategy: Send + Sync {
    fn merge_drive_orders(
        &self,
        current: &DriveOrder,
        new: &DriveOrder,
        vehicle: &Vehicle,
        route_provider: &dyn RouteProvider,
    ) -> Option<DriveOrder>;
}

/// Splices at the divergence point: the step of the old route sharing the
/// new route's first source point. Everything before that point is kept
/// unchanged, so the merged route stays a single connected path.
pub struct RegularDriveOrderMergeStrategy;

impl DriveOrderMergeStrategy for RegularDriveOrderMergeStrategy {
    fn merge_drive_orders(
        &self,
        current: &DriveOrder,
        new: &DriveOrder,
        vehicle: &Vehicle,
        route_provider: &dyn RouteProvider,
    ) -> Option<DriveOrder> {
        let old_route = current.route.as_ref()?;
        let new_route = new.route.as_ref()?;

        let new_source = match &new_route.steps.first()?.source_point {
            Some(source) => source.clone(),
            // A pure positioning step carries no source; its destination is
            // where the new route starts.
            None => new_route.steps.first()?.destination_point.clone(),
        };

        let mut merged_steps: Vec<Step>;
        if old_route.steps.first().and_then(|step| step.source_point.clone()).as_ref() == Some(&new_source) {
            // The new route starts where the old one started; nothing of the
            // old route has been earned yet, so it is replaced outright.
            merged_steps = Vec::new();
        } else {
            let divergence = old_route.steps.iter().position(|step| step.destination_point == new_source);
            match divergence {
                Some(index) => merged_steps = old_route.steps[..=index].to_vec(),
                None => {
                    // The new route does not reconnect to the old one
                    // anywhere; merging would fabricate history. Fail closed.
                    log::warn!(
                        "Cannot merge routes for vehicle {}: new route source {} does not appear in the current route.",
                        vehicle.id,
                        new_source
                    );
                    return None;
                }
            }
        }

        append_tagged(&mut merged_steps, &new_route.steps, ReroutingType::Regular);
        Some(finish_merge(current, merged_steps, vehicle, route_provider))
    }
}

/// Truncates the old route strictly at the vehicle's last confirmed step
/// and appends the new route from there. The result is not guaranteed to be
/// a connected path; that discontinuity is the accepted price of urgency.
pub struct ForcedDriveOrderMergeStrategy;

impl DriveOrderMergeStrategy for ForcedDriveOrderMergeStrategy {
    fn merge_drive_orders(
        &self,
        current: &DriveOrder,
        new: &DriveOrder,
        vehicle: &Vehicle,
        route_provider: &dyn RouteProvider,
    ) -> Option<DriveOrder> {
        let old_route = current.route.as_ref()?;
        let new_route = new.route.as_ref()?;

        let mut merged_steps: Vec<Step> = match vehicle.route_progress_index {
            Some(progress) => old_route.steps[..(progress + 1).min(old_route.steps.len())].to_vec(),
            None => Vec::new(),
        };
        append_tagged(&mut merged_steps, &new_route.steps, ReroutingType::Forced);
        Some(finish_merge(current, merged_steps, vehicle, route_provider))
    }
}

fn append_tagged(merged_steps: &mut Vec<Step>, new_steps: &[Step], tag: ReroutingType) {
    let splice_start = merged_steps.len();
    merged_steps.extend(new_steps.iter().cloned());
    if let Some(first_new) = merged_steps.get_mut(splice_start) {
        first_new.rerouting_type = Some(tag);
    }
}

/// Renumbers the merged steps contiguously and re-prices the whole stitched
/// route so its cost is not the sum of two independently priced fragments.
fn finish_merge(current: &DriveOrder, merged_steps: Vec<Step>, vehicle: &Vehicle, route_provider: &dyn RouteProvider) -> DriveOrder {
    let costs = route_provider.cost_of(vehicle, &merged_steps);
    DriveOrder::with_route(current.destination.clone(), Route::new(merged_steps, costs).renumbered())
}
