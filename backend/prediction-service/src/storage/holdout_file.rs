use super::HoldoutSet;
use crate::error::{AppError, Result};
use crate::models::{Cell, HeldOutCell, Rating};
use crate::services::matrix::RatingMatrix;
use std::path::{Path, PathBuf};
use tracing::info;

/// Test users supplied as `(user_id, item_id, rating)` triples.
///
/// Known ratings give the test user a profile; a `0` rating marks a cell to
/// predict. Test users are appended after the training users, so user id
/// `u` lands on row `train_users + (u - 1) % holdout_users`.
#[derive(Debug, Clone)]
pub struct HoldoutFileSource {
    path: PathBuf,
    holdout_users: usize,
}

impl HoldoutFileSource {
    pub fn new(path: impl Into<PathBuf>, holdout_users: usize) -> Self {
        Self {
            path: path.into(),
            holdout_users,
        }
    }

    /// Load the triples on top of a copy of the training matrix
    pub async fn load(&self, train: &RatingMatrix) -> Result<HoldoutSet> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AppError::io(&self.path, e))?;

        let set = parse_triples(&text, &self.path, train, self.holdout_users)?;

        info!(
            path = %self.path.display(),
            targets = set.targets.len(),
            "Held-out users loaded"
        );

        Ok(set)
    }
}

pub(crate) fn parse_triples(
    text: &str,
    path: &Path,
    train: &RatingMatrix,
    holdout_users: usize,
) -> Result<HoldoutSet> {
    if holdout_users == 0 {
        return Err(AppError::Configuration(
            "holdout_users must be greater than 0".to_string(),
        ));
    }

    let tokens = text
        .split_whitespace()
        .enumerate()
        .map(|(idx, token)| {
            token.parse::<i64>().map_err(|_| {
                AppError::format(path, format!("token {idx} is not an integer: {token:?}"))
            })
        })
        .collect::<Result<Vec<i64>>>()?;

    if tokens.len() % 3 != 0 {
        return Err(AppError::format(
            path,
            format!(
                "{} tokens do not form (user, item, rating) triples",
                tokens.len()
            ),
        ));
    }

    let train_users = train.entity_count();
    let mut matrix = train.with_extra_entities(holdout_users);
    let mut targets = Vec::new();

    for (line, triple) in tokens.chunks_exact(3).enumerate() {
        let (user_id, item_id, raw) = (triple[0], triple[1], triple[2]);

        let ids = u32::try_from(user_id)
            .ok()
            .zip(u32::try_from(item_id).ok())
            .filter(|(user, item)| *user >= 1 && *item >= 1 && *item as usize <= matrix.item_count());
        let Some((user_id, item_id)) = ids else {
            return Err(AppError::format(
                path,
                format!("triple {line} references user {user_id}, item {item_id} outside the matrix"),
            ));
        };

        let entity = train_users + (user_id as usize - 1) % holdout_users;
        let cell = Cell::new(entity, item_id as usize - 1);

        match Rating::from_raw(raw) {
            Some(Rating::Unrated) => {
                matrix.set(cell, Rating::Pending)?;
                targets.push(HeldOutCell {
                    cell,
                    user_id,
                    item_id,
                    actual: None,
                });
            }
            Some(rating) => matrix.set(cell, rating)?,
            None => {
                return Err(AppError::format(
                    path,
                    format!("triple {line} carries rating {raw} outside 0..=5"),
                ));
            }
        }
    }

    Ok(HoldoutSet { matrix, targets })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train() -> RatingMatrix {
        RatingMatrix::from_raw_rows(&[vec![5, 4, 0], vec![1, 0, 2]]).unwrap()
    }

    #[test]
    fn test_triples_map_onto_appended_rows() {
        let text = "201 1 5\n201 2 0\n202 3 4\n";
        let set = parse_triples(text, Path::new("test5.txt"), &train(), 100).unwrap();

        assert_eq!(set.matrix.entity_count(), 102);
        // user 201 -> (201 - 1) % 100 + 2 = 2
        assert_eq!(set.matrix.rating(2, 0).score(), Some(5));
        assert_eq!(set.matrix.rating(2, 1), Rating::Pending);
        assert_eq!(set.matrix.rating(3, 2).score(), Some(4));
        assert_eq!(set.matrix.rating(0, 0).score(), Some(5));

        assert_eq!(set.targets.len(), 1);
        let target = &set.targets[0];
        assert_eq!(target.cell, Cell::new(2, 1));
        assert_eq!((target.user_id, target.item_id), (201, 2));
        assert_eq!(target.actual, None);
    }

    #[test]
    fn test_partial_triple_is_a_format_error() {
        let err = parse_triples("201 1 5 201 2", Path::new("t"), &train(), 100).unwrap_err();
        assert!(matches!(err, AppError::Format { .. }));
    }

    #[test]
    fn test_unknown_item_is_a_format_error() {
        assert!(parse_triples("201 4 5", Path::new("t"), &train(), 100).is_err());
        assert!(parse_triples("201 0 5", Path::new("t"), &train(), 100).is_err());
    }

    #[test]
    fn test_ids_beyond_u32_are_format_errors() {
        let too_large = u64::from(u32::MAX) + 1;
        let err = parse_triples(&format!("{too_large} 1 0"), Path::new("t"), &train(), 100)
            .unwrap_err();
        assert!(matches!(err, AppError::Format { .. }));
        assert!(err.to_string().contains(&too_large.to_string()));

        assert!(parse_triples("-3 1 0", Path::new("t"), &train(), 100).is_err());

        let max = parse_triples(&format!("{} 1 0", u32::MAX), Path::new("t"), &train(), 100).unwrap();
        assert_eq!(max.targets[0].user_id, u32::MAX);
    }

    #[test]
    fn test_rating_off_scale_is_a_format_error() {
        let err = parse_triples("201 1 6", Path::new("t"), &train(), 100).unwrap_err();
        assert!(err.to_string().contains("outside 0..=5"));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test5.txt");
        std::fs::write(&path, "201 1 0\n201 3 3\n").unwrap();

        let source = HoldoutFileSource::new(&path, 100);
        let set = source.load(&train()).await.unwrap();

        assert_eq!(set.targets.len(), 1);
        assert_eq!(set.targets[0].cell, Cell::new(2, 0));
        assert_eq!(set.matrix.pending_cells(), vec![Cell::new(2, 0)]);
    }
}
