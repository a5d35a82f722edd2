use crate::models::answer::{classify_palette, AnswerStatus, PaletteState};
use crate::models::question::Question;
use crate::models::section::Section;
use crate::dto::api_dto::SaveAnswerRequest;
use crate::SessionContext;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewport {
    Desktop,
    Mobile,
}

impl Viewport {
    pub fn section_page_size(self) -> usize {
        match self {
            Viewport::Desktop => 2,
            Viewport::Mobile => 1,
        }
    }

    pub fn question_page_size(self) -> usize {
        match self {
            Viewport::Desktop => 10,
            Viewport::Mobile => 3,
        }
    }
}

/// Time spent on the question being left, captured at the moment of
/// navigation. Persisted fire-and-forget; not correctness-critical.
#[derive(Debug, Clone)]
pub struct ElapsedOnQuestion {
    pub section_index: usize,
    pub question_index: usize,
    pub seconds: i64,
}

pub struct NavigationState {
    sections: Vec<Section>,
    active_section: usize,
    active_question: usize,
    visited: HashSet<Uuid>,
    entered_at: Instant,
    statuses: HashMap<Uuid, AnswerStatus>,
    viewport: Viewport,
    section_page: usize,
    question_page: usize,
}

impl NavigationState {
    pub fn new(sections: Vec<Section>, viewport: Viewport) -> Self {
        let mut state = Self {
            sections,
            active_section: 0,
            active_question: 0,
            visited: HashSet::new(),
            entered_at: Instant::now(),
            statuses: HashMap::new(),
            viewport,
            section_page: 0,
            question_page: 0,
        };
        if let Some(q) = state.current_question() {
            let id = q.id;
            state.visited.insert(id);
        }
        state
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn active_indices(&self) -> (usize, usize) {
        (self.active_section, self.active_question)
    }

    pub fn current_section(&self) -> Option<&Section> {
        self.sections.get(self.active_section)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_section()
            .and_then(|s| s.questions.get(self.active_question))
    }

    pub fn at_start(&self) -> bool {
        self.active_section == 0 && self.active_question == 0
    }

    pub fn at_end(&self) -> bool {
        match self.sections.last() {
            Some(last) => {
                self.active_section == self.sections.len() - 1
                    && self.active_question + 1 >= last.questions.len().max(1)
            }
            None => true,
        }
    }

    fn enter(&mut self, section: usize, question: usize) {
        self.active_section = section;
        self.active_question = question;
        if let Some(q) = self.current_question() {
            let id = q.id;
            self.visited.insert(id);
        }
        self.entered_at = Instant::now();
        self.sync_pages();
    }

    fn leave_current(&mut self) -> ElapsedOnQuestion {
        ElapsedOnQuestion {
            section_index: self.active_section,
            question_index: self.active_question,
            seconds: self.entered_at.elapsed().as_secs() as i64,
        }
    }

    /// Switch to a question, capturing elapsed time on the one being left.
    /// Returns `None` on out-of-range or no-op navigation.
    pub fn select_question_local(
        &mut self,
        question: usize,
        section: Option<usize>,
    ) -> Option<ElapsedOnQuestion> {
        let section = section.unwrap_or(self.active_section);
        let target = self.sections.get(section)?;
        if question >= target.questions.len() {
            return None;
        }
        if section == self.active_section && question == self.active_question {
            return None;
        }
        let elapsed = self.leave_current();
        self.enter(section, question);
        Some(elapsed)
    }

    /// Switch section, resetting to its first question. Re-selecting the
    /// active section still resets the index and the question timer.
    pub fn select_section_local(&mut self, section: usize) -> Option<ElapsedOnQuestion> {
        if section >= self.sections.len() {
            return None;
        }
        let elapsed = self.leave_current();
        self.enter(section, 0);
        Some(elapsed)
    }

    /// Next question, crossing into the following section at a boundary.
    /// `None` at the very last question of the assessment.
    pub fn next_local(&mut self) -> Option<ElapsedOnQuestion> {
        let current_len = self.current_section()?.questions.len();
        if self.active_question + 1 < current_len {
            self.select_question_local(self.active_question + 1, None)
        } else if self.active_section + 1 < self.sections.len() {
            self.select_question_local(0, Some(self.active_section + 1))
        } else {
            None
        }
    }

    /// Previous question, crossing into the preceding section's last
    /// question at a boundary. `None` at the very first question.
    pub fn previous_local(&mut self) -> Option<ElapsedOnQuestion> {
        if self.active_question > 0 {
            self.select_question_local(self.active_question - 1, None)
        } else if self.active_section > 0 {
            let prev = self.active_section - 1;
            let last = self.sections[prev].questions.len().checked_sub(1)?;
            self.select_question_local(last, Some(prev))
        } else {
            None
        }
    }

    pub fn palette_state(&self, question_id: Uuid) -> PaletteState {
        let current_id = self.current_question().map(|q| q.id).unwrap_or_default();
        classify_palette(
            question_id,
            current_id,
            self.statuses.get(&question_id),
            self.visited.contains(&question_id),
        )
    }

    pub fn status(&self, question_id: Uuid) -> Option<&AnswerStatus> {
        self.statuses.get(&question_id)
    }

    pub fn apply_statuses(&mut self, per_section: HashMap<Uuid, Vec<AnswerStatus>>) {
        self.statuses = per_section
            .into_values()
            .flatten()
            .map(|s| (s.question_id, s))
            .collect();
    }

    /// Refresh the answer-status map. On failure the previous map stays in
    /// place; stale-but-available beats blocking navigation.
    pub async fn refresh_statuses(&mut self, ctx: &SessionContext) {
        let Some(submission_id) = ctx.store.submission_id() else {
            return;
        };
        match ctx.api.section_wise_status(submission_id).await {
            Ok(response) => self.apply_statuses(response.sections),
            Err(e) => tracing::warn!("Status refresh failed, keeping stale map: {}", e),
        }
    }

    pub async fn select_section(&mut self, section: usize, ctx: &SessionContext) {
        if let Some(elapsed) = self.select_section_local(section) {
            self.persist_elapsed(ctx, elapsed);
            self.refresh_statuses(ctx).await;
        }
    }

    pub fn select_question(&mut self, question: usize, section: Option<usize>, ctx: &SessionContext) {
        if let Some(elapsed) = self.select_question_local(question, section) {
            self.persist_elapsed(ctx, elapsed);
        }
    }

    pub fn next(&mut self, ctx: &SessionContext) {
        if let Some(elapsed) = self.next_local() {
            self.persist_elapsed(ctx, elapsed);
        }
    }

    pub fn previous(&mut self, ctx: &SessionContext) {
        if let Some(elapsed) = self.previous_local() {
            self.persist_elapsed(ctx, elapsed);
        }
    }

    /// Fire-and-forget time-taken write. Failures are logged and dropped;
    /// the task is abortable through the pending-writes registry.
    fn persist_elapsed(&self, ctx: &SessionContext, elapsed: ElapsedOnQuestion) {
        let Some(submission_id) = ctx.store.submission_id() else {
            return;
        };
        let Some(section) = self.sections.get(elapsed.section_index) else {
            return;
        };
        let Some(question) = section.questions.get(elapsed.question_index) else {
            return;
        };
        let existing = self.statuses.get(&question.id);
        let request = SaveAnswerRequest {
            section_id: section.id,
            question_id: question.id,
            answer_type: question.question_type,
            selected_options: existing.map(|s| s.selected_options.clone()).unwrap_or_default(),
            code_solution: existing.and_then(|s| s.code_solution.clone()),
            code_language: existing.and_then(|s| s.code_language.clone()),
            text_answer: existing.and_then(|s| s.text_answer.clone()),
            is_marked_for_review: existing.map(|s| s.is_marked_for_review).unwrap_or(false),
            time_taken_seconds: elapsed.seconds,
            is_skipped: existing.map(|s| !s.has_answer()).unwrap_or(true),
        };
        let api = ctx.api.clone();
        ctx.pending.spawn_telemetry(async move {
            if let Err(e) = api.save_answer(submission_id, &request).await {
                tracing::debug!("Time-taken save dropped: {}", e);
            }
        });
    }

    fn sync_pages(&mut self) {
        self.section_page = self.active_section / self.viewport.section_page_size();
        self.question_page = self.active_question / self.viewport.question_page_size();
    }

    /// Window of section indices visible in the section strip.
    pub fn visible_sections(&self) -> std::ops::Range<usize> {
        let size = self.viewport.section_page_size();
        let start = self.section_page * size;
        start..(start + size).min(self.sections.len())
    }

    /// Window of question indices visible in the palette for the active
    /// section.
    pub fn visible_questions(&self) -> std::ops::Range<usize> {
        let size = self.viewport.question_page_size();
        let total = self
            .current_section()
            .map(|s| s.questions.len())
            .unwrap_or(0);
        let start = self.question_page * size;
        start..(start + size).min(total)
    }

    pub fn next_question_page(&mut self) {
        let size = self.viewport.question_page_size();
        let total = self
            .current_section()
            .map(|s| s.questions.len())
            .unwrap_or(0);
        if (self.question_page + 1) * size < total {
            self.question_page += 1;
        }
    }

    pub fn previous_question_page(&mut self) {
        self.question_page = self.question_page.saturating_sub(1);
    }

    pub fn next_section_page(&mut self) {
        let size = self.viewport.section_page_size();
        if (self.section_page + 1) * size < self.sections.len() {
            self.section_page += 1;
        }
    }

    pub fn previous_section_page(&mut self) {
        self.section_page = self.section_page.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{
        ChoiceDetails, QuestionDetails, QuestionPrompt, QuestionType,
    };

    fn question(section_id: Uuid) -> Question {
        Question {
            id: Uuid::new_v4(),
            section_id,
            question_type: QuestionType::SingleCorrect,
            marks: 1,
            prompt: QuestionPrompt {
                text: "q".into(),
                image_urls: vec![],
            },
            details: QuestionDetails::Choice(ChoiceDetails { options: vec![] }),
        }
    }

    fn section(questions: usize) -> Section {
        let id = Uuid::new_v4();
        Section {
            id,
            title: "s".into(),
            description: None,
            duration_minutes: 10,
            questions: (0..questions).map(|_| question(id)).collect(),
        }
    }

    fn nav(layout: &[usize], viewport: Viewport) -> NavigationState {
        NavigationState::new(layout.iter().map(|&n| section(n)).collect(), viewport)
    }

    #[test]
    fn next_crosses_section_boundary() {
        let mut n = nav(&[2, 3], Viewport::Desktop);
        assert!(n.next_local().is_some());
        assert_eq!(n.active_indices(), (0, 1));
        assert!(n.next_local().is_some());
        assert_eq!(n.active_indices(), (1, 0));
    }

    #[test]
    fn previous_crosses_into_prior_section_last_question() {
        let mut n = nav(&[2, 3], Viewport::Desktop);
        n.select_question_local(0, Some(1));
        assert!(n.previous_local().is_some());
        assert_eq!(n.active_indices(), (0, 1));
    }

    #[test]
    fn boundaries_disable_navigation() {
        let mut n = nav(&[2, 2], Viewport::Desktop);
        assert!(n.at_start());
        assert!(n.previous_local().is_none());
        n.select_question_local(1, Some(1));
        assert!(n.at_end());
        assert!(n.next_local().is_none());
    }

    #[test]
    fn select_section_resets_question_index() {
        let mut n = nav(&[3, 3], Viewport::Desktop);
        n.select_question_local(2, None);
        assert!(n.select_section_local(1).is_some());
        assert_eq!(n.active_indices(), (1, 0));
    }

    #[test]
    fn reselecting_active_section_resets_to_first_question() {
        let mut n = nav(&[3, 3], Viewport::Desktop);
        n.select_question_local(2, None);
        assert!(n.select_section_local(0).is_some());
        assert_eq!(n.active_indices(), (0, 0));
    }

    #[test]
    fn selecting_same_question_is_a_noop() {
        let mut n = nav(&[3], Viewport::Desktop);
        assert!(n.select_question_local(0, None).is_none());
    }

    #[test]
    fn visited_questions_show_unanswered_visited() {
        let mut n = nav(&[3], Viewport::Desktop);
        let first = n.current_question().unwrap().id;
        n.select_question_local(1, None);
        assert_eq!(n.palette_state(first), PaletteState::UnansweredVisited);
        let third = n.sections()[0].questions[2].id;
        assert_eq!(n.palette_state(third), PaletteState::NotVisited);
    }

    #[test]
    fn current_question_shows_current() {
        let n = nav(&[2], Viewport::Desktop);
        let id = n.current_question().unwrap().id;
        assert_eq!(n.palette_state(id), PaletteState::Current);
    }

    #[test]
    fn status_map_drives_answered_and_review_states() {
        let mut n = nav(&[3], Viewport::Desktop);
        let answered = n.sections()[0].questions[1].id;
        let review = n.sections()[0].questions[2].id;
        let section_id = n.sections()[0].id;

        let mut map = HashMap::new();
        map.insert(
            section_id,
            vec![
                AnswerStatus {
                    question_id: answered,
                    selected_options: vec![Uuid::new_v4()],
                    ..Default::default()
                },
                AnswerStatus {
                    question_id: review,
                    is_marked_for_review: true,
                    ..Default::default()
                },
            ],
        );
        n.apply_statuses(map);

        assert_eq!(n.palette_state(answered), PaletteState::Answered);
        assert_eq!(n.palette_state(review), PaletteState::MarkedForReview);
    }

    #[test]
    fn desktop_pagination_windows() {
        let mut n = nav(&[25, 5, 5], Viewport::Desktop);
        assert_eq!(n.visible_questions(), 0..10);
        n.select_question_local(14, None);
        assert_eq!(n.visible_questions(), 10..20);
        assert_eq!(n.visible_sections(), 0..2);
        n.select_section_local(2);
        assert_eq!(n.visible_sections(), 2..3);
    }

    #[test]
    fn mobile_pagination_windows() {
        let mut n = nav(&[7], Viewport::Mobile);
        assert_eq!(n.visible_questions(), 0..3);
        n.next_question_page();
        assert_eq!(n.visible_questions(), 3..6);
        n.next_question_page();
        assert_eq!(n.visible_questions(), 6..7);
        n.next_question_page();
        assert_eq!(n.visible_questions(), 6..7);
    }
}
