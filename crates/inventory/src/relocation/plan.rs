use stockreloc_core::{DomainResult, LocationId, PackageId};

use crate::product::ProductCatalog;
use crate::quant::Quant;

use super::checks::ensure_relocatable;
use super::{
    DEFAULT_MOVE_NAME, MoveExecutor, PackageContents, RELOCATION_SEQUENCE, RelocationMove,
    RelocationMoveLine, RelocationPlan, RelocationRequest, SequenceSource,
};

/// Builds the moves of a relocation without executing them.
///
/// Quants are grouped by (package, location) in the order they were selected;
/// every group goes to the destination assigned to its first quant, and groups
/// without one are skipped. All quants are validated before a batch number is
/// drawn.
pub fn plan_relocation<Q, P>(
    request: &RelocationRequest,
    products: &ProductCatalog,
    sequences: &Q,
    packages: &P,
) -> DomainResult<RelocationPlan>
where
    Q: SequenceSource + ?Sized,
    P: PackageContents + ?Sized,
{
    for quant in &request.quants {
        ensure_relocatable(quant, products)?;
    }
    let batch_number = sequences.next_value(RELOCATION_SEQUENCE)?;
    let name = request
        .message
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_MOVE_NAME.to_string());

    let mut groups: Vec<((Option<PackageId>, LocationId), Vec<&Quant>)> = Vec::new();
    for quant in &request.quants {
        let key = (quant.package_id, quant.location_id);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(quant),
            None => groups.push((key, vec![quant])),
        }
    }

    let mut plan = RelocationPlan {
        batch_number,
        ..RelocationPlan::default()
    };
    for (key, members) in groups {
        let Some(destination) = members[0].relocation_destination else {
            tracing::debug!(package = ?key.0, location = %key.1, "no destination assigned; group skipped");
            plan.skipped.push(key);
            continue;
        };

        let mut staying_packed = Vec::with_capacity(members.len());
        for quant in members.iter().copied() {
            if request.is_partial_package
                && request.dest_package.is_none()
                && leaves_package_behind(quant, &members, packages)?
            {
                plan.moves
                    .push(move_for(quant, destination, None, &name, request, &plan.batch_number));
            } else {
                staying_packed.push(quant);
            }
        }
        for quant in staying_packed {
            let result_package = request.dest_package.or(quant.package_id);
            plan.moves.push(move_for(
                quant,
                destination,
                result_package,
                &name,
                request,
                &plan.batch_number,
            ));
        }
    }

    tracing::info!(
        batch = %plan.batch_number,
        moves = plan.moves.len(),
        skipped = plan.skipped.len(),
        "relocation planned"
    );
    Ok(plan)
}

/// Plans the relocation and hands the moves to `executor`.
pub fn relocate<Q, P, E>(
    request: &RelocationRequest,
    products: &ProductCatalog,
    sequences: &Q,
    packages: &P,
    executor: &E,
) -> DomainResult<RelocationPlan>
where
    Q: SequenceSource + ?Sized,
    P: PackageContents + ?Sized,
    E: MoveExecutor + ?Sized,
{
    let plan = plan_relocation(request, products, sequences, packages)?;
    executor.execute(&plan.moves)?;
    Ok(plan)
}

/// True when the quant's package also holds quants outside the group.
fn leaves_package_behind<P>(quant: &Quant, group: &[&Quant], packages: &P) -> DomainResult<bool>
where
    P: PackageContents + ?Sized,
{
    let Some(package) = quant.package_id else {
        return Ok(false);
    };
    let contents = packages.quants_in_package(package)?;
    Ok(contents.iter().any(|id| !group.iter().any(|q| q.id == *id)))
}

fn move_for(
    quant: &Quant,
    destination: LocationId,
    result_package: Option<PackageId>,
    name: &str,
    request: &RelocationRequest,
    batch_number: &str,
) -> RelocationMove {
    RelocationMove {
        name: name.to_string(),
        quant_id: quant.id,
        product_id: quant.product_id,
        quantity: quant.quantity,
        location_id: quant.location_id,
        location_dest_id: destination,
        restrict_partner_id: quant.owner_id,
        line: RelocationMoveLine {
            lot_id: quant.lot_id,
            package_id: quant.package_id,
            result_package_id: result_package,
            owner_id: quant.owner_id,
            operator: request.operator.clone(),
            batch_number: Some(batch_number.to_string()),
        },
    }
}
