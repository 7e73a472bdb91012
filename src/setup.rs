//! Draft state for the journey creation form.

use rand::seq::SliceRandom;
use tracing::warn;

use crate::store::{MilestoneDraft, NewProject, ValidationError};
use crate::suggest::SuggestError;
use crate::types::{AiSuggestion, MAX_MILESTONES, MIN_MILESTONES};

/// How many inspiration chips are shown at once.
pub const INSPIRATION_COUNT: usize = 10;

pub const DEFAULT_INSPIRATIONS: [&str; 24] = [
    "去便利店买支喜欢的冰淇淋 🍦",
    "在公园长椅发呆20分钟 🌳",
    "泡个热水澡并点上香薰 🛁",
    "整理相册重温美好回忆 📷",
    "去图书馆借本没看过的书 📚",
    "给自己煮一杯手冲咖啡 ☕",
    "听一集收藏很久的播客 🎧",
    "睡一个没有任何闹钟的午觉 💤",
    "去花店买一支当季的鲜花 🌷",
    "看一部宫崎骏的电影 🎬",
    "去附近的河边/湖边看夕阳 🌅",
    "买一张刮刮乐试试手气 🍀",
    "整理房间的一个角落 🧹",
    "用音箱大声放喜欢的歌 🎵",
    "去吃一顿舒适的早餐 🥐",
    "给最好的朋友打个电话 📞",
    "去逛逛文具店买支笔 ✏️",
    "在路边观察流浪猫/狗 🐈",
    "涂鸦或画一幅简单的画 🎨",
    "做10分钟的全身拉伸 🧘‍♀️",
    "去超市捏捏方便面（解压）🍜",
    "煮一碗加了荷包蛋的面 🍜",
    "删掉手机里不需要的APP 📱",
    "去闻闻雨后泥土的味道 🌧️",
];

/// Identifies one outstanding suggestion request. Results carrying an older
/// ticket are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuggestionTicket(u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetupNotice {
    NeedName,
    NeedCity,
    SuggestionFailed(String),
}

#[derive(Clone, Debug)]
pub struct SetupForm {
    pub name: String,
    pub city: String,
    rows: Vec<MilestoneDraft>,
    inspirations: Vec<String>,
    request_seq: u64,
    pending: Option<SuggestionTicket>,
    notice: Option<SetupNotice>,
}

impl Default for SetupForm {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupForm {
    pub fn new() -> Self {
        let mut form = Self {
            name: String::new(),
            city: String::new(),
            rows: vec![MilestoneDraft::default(); MIN_MILESTONES],
            inspirations: Vec::new(),
            request_seq: 0,
            pending: None,
            notice: None,
        };
        form.shuffle_inspirations();
        form
    }

    pub fn rows(&self) -> &[MilestoneDraft] {
        &self.rows
    }

    pub fn inspirations(&self) -> &[String] {
        &self.inspirations
    }

    pub fn can_add_row(&self) -> bool {
        self.rows.len() < MAX_MILESTONES
    }

    pub fn can_remove_row(&self) -> bool {
        self.rows.len() > MIN_MILESTONES
    }

    pub fn add_row(&mut self) -> bool {
        if !self.can_add_row() {
            return false;
        }
        self.rows.push(MilestoneDraft::default());
        true
    }

    pub fn remove_row(&mut self, index: usize) -> bool {
        if !self.can_remove_row() || index >= self.rows.len() {
            return false;
        }
        self.rows.remove(index);
        true
    }

    pub fn set_title(&mut self, index: usize, title: &str) {
        if let Some(row) = self.rows.get_mut(index) {
            row.title = title.to_string();
        }
    }

    pub fn set_reward(&mut self, index: usize, reward: &str) {
        if let Some(row) = self.rows.get_mut(index) {
            row.reward = reward.to_string();
        }
    }

    /// Put an inspiration into the first row without a reward, or into a
    /// new row if every row is filled and there is room. Returns the row
    /// index used.
    pub fn apply_inspiration(&mut self, text: &str) -> Option<usize> {
        if let Some(index) = self.rows.iter().position(|r| r.reward.trim().is_empty()) {
            self.rows[index].reward = text.to_string();
            return Some(index);
        }
        if !self.can_add_row() {
            return None;
        }
        self.rows.push(MilestoneDraft::new("", text));
        Some(self.rows.len() - 1)
    }

    pub fn shuffle_inspirations(&mut self) {
        let mut pool: Vec<String> = DEFAULT_INSPIRATIONS.iter().map(|s| s.to_string()).collect();
        pool.shuffle(&mut rand::rng());
        pool.truncate(INSPIRATION_COUNT);
        self.inspirations = pool;
    }

    /// Replace the chips with fetched ideas; an empty list keeps the current chips.
    pub fn apply_reward_ideas(&mut self, ideas: Vec<String>) {
        if !ideas.is_empty() {
            self.inspirations = ideas;
        }
    }

    /// Check that a city is set before asking for local reward ideas.
    pub fn reward_ideas_city(&mut self) -> Option<String> {
        let city = self.city.trim();
        if city.is_empty() {
            self.notice = Some(SetupNotice::NeedCity);
            return None;
        }
        Some(city.to_string())
    }

    /// Start a prefill request. Requires a project name.
    pub fn begin_suggestion(&mut self) -> Option<SuggestionTicket> {
        if self.name.trim().is_empty() {
            self.notice = Some(SetupNotice::NeedName);
            return None;
        }
        self.request_seq += 1;
        let ticket = SuggestionTicket(self.request_seq);
        self.pending = Some(ticket);
        Some(ticket)
    }

    /// Forget any in-flight request, e.g. when the user leaves the form.
    pub fn cancel_suggestion(&mut self) {
        self.pending = None;
    }

    pub fn is_generating(&self) -> bool {
        self.pending.is_some()
    }

    /// Apply a prefill result. Rows change only for the current ticket and a
    /// successful result; a failure leaves every row exactly as typed.
    /// Returns whether the rows were replaced.
    pub fn apply_suggestion(
        &mut self,
        ticket: SuggestionTicket,
        result: Result<AiSuggestion, SuggestError>,
    ) -> bool {
        if self.pending != Some(ticket) {
            return false;
        }
        self.pending = None;
        match result {
            Ok(suggestion) => {
                let mut rows: Vec<MilestoneDraft> = suggestion
                    .milestones
                    .into_iter()
                    .take(MAX_MILESTONES)
                    .map(|m| MilestoneDraft::new(m.title, m.reward))
                    .collect();
                if rows.is_empty() {
                    self.notice = Some(SetupNotice::SuggestionFailed("empty suggestion".to_string()));
                    return false;
                }
                rows.resize(rows.len().max(MIN_MILESTONES), MilestoneDraft::default());
                self.rows = rows;
                true
            }
            Err(e) => {
                warn!(error = %e, "suggestion failed");
                self.notice = Some(SetupNotice::SuggestionFailed(e.to_string()));
                false
            }
        }
    }

    /// Take the one-shot notice, if any.
    pub fn take_notice(&mut self) -> Option<SetupNotice> {
        self.notice.take()
    }

    pub fn submit(&self) -> Result<NewProject, ValidationError> {
        NewProject::new(&self.name, self.rows.clone())
    }
}
