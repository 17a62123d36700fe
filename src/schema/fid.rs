use super::FieldDef;

/// Assign stable field identifiers in place.
///
/// FID `0` means unassigned. Existing non-zero FIDs (including gaps below
/// the current max) are left untouched; unassigned fields receive
/// `max+1, max+2, …` in declaration order (spec §3 invariant 1).
pub fn assign_fids(fields: &mut [FieldDef]) {
	let mut max = fields.iter().map(|f| f.fid).max().unwrap_or(0);
	for f in fields.iter_mut() {
		if f.fid == 0 {
			max += 1;
			f.fid = max;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::FieldType;

	#[test]
	fn leaves_gaps_and_assigns_new_fields_after_max() {
		let mut fields = vec![
			FieldDef::new("a", FieldType::Int).with_fid(1),
			FieldDef::new("b", FieldType::Int), // unassigned
			FieldDef::new("c", FieldType::Int).with_fid(5),
			FieldDef::new("d", FieldType::Int), // unassigned
		];
		assign_fids(&mut fields);
		assert_eq!(fields[0].fid, 1);
		assert_eq!(fields[1].fid, 6);
		assert_eq!(fields[2].fid, 5);
		assert_eq!(fields[3].fid, 7);
	}

	#[test]
	fn no_unassigned_fields_is_a_no_op() {
		let mut fields = vec![FieldDef::new("a", FieldType::Int).with_fid(3)];
		assign_fids(&mut fields);
		assert_eq!(fields[0].fid, 3);
	}
}
