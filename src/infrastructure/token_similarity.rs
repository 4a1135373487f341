//! 词袋余弦相似度
//!
//! 英文/数字按单词切分，中日韩文字按相邻字二元组切分。
//! 使用 BTreeMap 保证累加顺序固定，同样的输入总是得到同样的分数。

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::infrastructure::SimilarityComparator;

/// 本地确定性相似度比较器
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSimilarity;

impl TokenSimilarity {
    pub fn new() -> Self {
        Self
    }

    /// 计算两段文本的余弦相似度（0..=1）
    pub fn score(&self, a: &str, b: &str) -> f64 {
        let va = term_frequencies(a);
        let vb = term_frequencies(b);
        if va.is_empty() || vb.is_empty() {
            return 0.0;
        }

        let dot: f64 = va
            .iter()
            .filter_map(|(term, x)| vb.get(term).map(|y| x * y))
            .sum();
        let norm_a = va.values().map(|x| x * x).sum::<f64>().sqrt();
        let norm_b = vb.values().map(|x| x * x).sum::<f64>().sqrt();

        (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
    }
}

#[async_trait]
impl SimilarityComparator for TokenSimilarity {
    async fn similarity(&self, content_a: &str, content_b: &str) -> Result<f64> {
        Ok(self.score(content_a, content_b))
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{3040}'..='\u{30FF}'
        | '\u{AC00}'..='\u{D7AF}')
}

fn term_frequencies(text: &str) -> BTreeMap<String, f64> {
    let mut terms = BTreeMap::new();
    let mut word = String::new();
    let mut cjk_run: Vec<char> = Vec::new();

    let flush_word = |word: &mut String, terms: &mut BTreeMap<String, f64>| {
        if !word.is_empty() {
            *terms.entry(std::mem::take(word)).or_insert(0.0) += 1.0;
        }
    };
    let flush_cjk = |run: &mut Vec<char>, terms: &mut BTreeMap<String, f64>| {
        match run.len() {
            0 => {}
            1 => *terms.entry(run[0].to_string()).or_insert(0.0) += 1.0,
            _ => {
                for pair in run.windows(2) {
                    let bigram: String = pair.iter().collect();
                    *terms.entry(bigram).or_insert(0.0) += 1.0;
                }
            }
        }
        run.clear();
    };

    for c in text.chars() {
        if is_cjk(c) {
            flush_word(&mut word, &mut terms);
            cjk_run.push(c);
        } else if c.is_alphanumeric() {
            flush_cjk(&mut cjk_run, &mut terms);
            word.extend(c.to_lowercase());
        } else {
            flush_word(&mut word, &mut terms);
            flush_cjk(&mut cjk_run, &mut terms);
        }
    }
    flush_word(&mut word, &mut terms);
    flush_cjk(&mut cjk_run, &mut terms);

    terms
}
