use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use super::{Book, BookId};

/// 人気書籍として扱う貸出回数上位の件数
pub const POPULAR_POOL_SIZE: usize = 50;

/// おすすめの階層（小さいほど優先）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecommendationTier {
    /// 対象書籍と同じ著者
    SameAuthor = 1,
    /// 対象書籍とカテゴリを1つ以上共有
    SharedCategory = 2,
    /// 貸出回数上位
    Popular = 3,
}

/// ランク付けされたおすすめ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub book: Book,
    pub tier: RecommendationTier,
    pub borrow_count: i64,
}

/// 候補の階層を判定する。どの階層にも属さなければNone。
pub fn classify(
    target: &Book,
    candidate: &Book,
    related: &HashSet<BookId>,
    popular: &HashSet<BookId>,
) -> Option<RecommendationTier> {
    if candidate.id == target.id {
        return None;
    }
    if candidate.author_id == target.author_id {
        Some(RecommendationTier::SameAuthor)
    } else if related.contains(&candidate.id) {
        Some(RecommendationTier::SharedCategory)
    } else if popular.contains(&candidate.id) {
        Some(RecommendationTier::Popular)
    } else {
        None
    }
}

/// 純粋関数：おすすめを3階層でランク付けする
///
/// ビジネスルール：
/// - 第1階層：同じ著者、第2階層：カテゴリ共有、第3階層：人気書籍
/// - 階層内は貸出回数の降順、次に出版年の降順
/// - 対象書籍自身は常に除外
/// - 結果はlimit件に切り詰める
pub fn rank_recommendations(
    target: &Book,
    candidates: Vec<Book>,
    related: &HashSet<BookId>,
    popular: &HashSet<BookId>,
    borrow_counts: &HashMap<BookId, i64>,
    limit: usize,
) -> Vec<Recommendation> {
    let mut seen = HashSet::new();
    let mut ranked: Vec<Recommendation> = candidates
        .into_iter()
        .filter(|book| seen.insert(book.id))
        .filter_map(|book| {
            let tier = classify(target, &book, related, popular)?;
            let borrow_count = borrow_counts.get(&book.id).copied().unwrap_or(0);
            Some(Recommendation {
                book,
                tier,
                borrow_count,
            })
        })
        .collect();

    ranked.sort_by_key(|r| {
        (
            r.tier,
            Reverse(r.borrow_count),
            Reverse(r.book.publication_year),
        )
    });
    ranked.truncate(limit);
    ranked
}
