use crate::domain::{
    BookId, ItemId, ItemType,
    recommendation::{POPULAR_POOL_SIZE, RecommendationTier, rank_recommendations},
};
use futures::future::try_join_all;
use std::collections::{BTreeSet, HashSet};

use super::ServiceDependencies;
use super::aggregation::{BookView, assemble_view};
use super::errors::{BookApplicationError, CATEGORY_SERVICE, Result};

/// ランク付け済みのおすすめ1件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendedBook {
    pub view: BookView,
    pub tier: RecommendationTier,
    pub borrow_count: i64,
}

/// 対象書籍とカテゴリを共有する書籍（対象自身は除く）
async fn books_sharing_categories(
    deps: &ServiceDependencies,
    book_id: BookId,
) -> Result<HashSet<BookId>> {
    let item_type = ItemType::book();
    let categories = deps
        .category_service
        .associations_of(ItemId::from(book_id), &item_type)
        .await
        .map_err(BookApplicationError::remote(CATEGORY_SERVICE))?;

    if categories.is_empty() {
        return Ok(HashSet::new());
    }

    let category_ids: Vec<_> = categories
        .iter()
        .map(|c| c.id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let items = deps
        .category_service
        .items_tagged_by(&category_ids, &item_type)
        .await
        .map_err(BookApplicationError::remote(CATEGORY_SERVICE))?;

    Ok(items
        .into_iter()
        .map(BookId::from)
        .filter(|id| *id != book_id)
        .collect())
}

/// おすすめの書籍を取得する
///
/// 3階層でランク付けする：
/// 1. 対象書籍と同じ著者
/// 2. 対象書籍とカテゴリを共有（カテゴリサービスで解決）
/// 3. 貸出回数上位50冊
///
/// 階層内は貸出回数の降順、次に出版年の降順。対象書籍自身は含まない。
pub async fn get_recommendations(
    deps: &ServiceDependencies,
    book_id: BookId,
    limit: usize,
) -> Result<Vec<RecommendedBook>> {
    // 1. 対象書籍
    let target = deps
        .inventory_store
        .get_book(book_id)
        .await?
        .ok_or(BookApplicationError::BookNotFound)?;

    // 2. カテゴリ共有の書籍
    let related = books_sharing_categories(deps, book_id).await?;

    // 3. 人気書籍
    let popular: HashSet<BookId> = deps
        .lending_ledger
        .most_borrowed(POPULAR_POOL_SIZE)
        .await?
        .into_iter()
        .map(|(id, _)| id)
        .collect();

    // 4. 候補の取得と貸出回数
    let pool: Vec<BookId> = related.union(&popular).copied().collect();
    let candidates = deps
        .inventory_store
        .find_recommendation_candidates(&target, &pool)
        .await?;
    let candidate_ids: Vec<BookId> = candidates.iter().map(|b| b.id).collect();
    let borrow_counts = deps.lending_ledger.borrow_counts(&candidate_ids).await?;

    // 5. ランク付け（純粋関数）
    let ranked = rank_recommendations(
        &target,
        candidates,
        &related,
        &popular,
        &borrow_counts,
        limit,
    );

    // 6. 行ごとのファンアウト
    try_join_all(ranked.into_iter().map(|r| async move {
        let view = assemble_view(deps, r.book).await?;
        Ok::<_, BookApplicationError>(RecommendedBook {
            view,
            tier: r.tier,
            borrow_count: r.borrow_count,
        })
    }))
    .await
}
