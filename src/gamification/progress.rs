//! Per-course progress tracking.
//!
//! `record_lesson` is the single mutation path for a [`UserProgress`]; it keeps
//! `completion_percentage` in step with `completed_lessons` and only ever
//! moves the status forward.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::types::{Course, ProgressStatus, UserProgress};

/// Rounded percentage of `completed` lessons out of `total`.
pub fn completion_percentage(completed: usize, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let completed = completed as u64;
    let total = u64::from(total);
    // Half rounds up.
    ((200 * completed + total) / (2 * total)) as u32
}

/// What a recorded lesson changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonRecorded {
    /// False when the lesson had already been completed
    pub newly_completed: bool,
    /// True only on the transition into `completed`
    pub course_completed: bool,
}

/// Progress tracker for one course.
pub struct ProgressTracker<'a> {
    course: &'a Course,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(course: &'a Course) -> Self {
        Self { course }
    }

    /// Fresh progress for a user starting the course.
    pub fn start(&self, user_id: &str, now: DateTime<Utc>) -> UserProgress {
        UserProgress {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            course_id: self.course.id.clone(),
            current_lesson: 0,
            completed_lessons: BTreeSet::new(),
            total_score: 0,
            completion_percentage: 0,
            status: ProgressStatus::InProgress,
            best_session_score: 0,
            total_time_spent: 0,
            streak_days: 0,
            started_at: now,
            completed_at: None,
            last_activity: now,
        }
    }

    /// Apply a finished lesson to `progress`.
    pub fn record_lesson(
        &self,
        progress: &mut UserProgress,
        lesson_id: u32,
        score: u32,
        time_spent: u64,
        now: DateTime<Utc>,
    ) -> Result<LessonRecorded, ProgressError> {
        if progress.course_id != self.course.id {
            return Err(ProgressError::CourseMismatch {
                expected: self.course.id.clone(),
                actual: progress.course_id.clone(),
            });
        }
        if self.course.lesson(lesson_id).is_none() {
            return Err(ProgressError::InvalidLesson {
                course_id: self.course.id.clone(),
                lesson_id,
                lesson_count: self.course.lesson_count(),
            });
        }

        let newly_completed = progress.completed_lessons.insert(lesson_id);
        progress.current_lesson = progress.current_lesson.max(lesson_id + 1);
        progress.completion_percentage = completion_percentage(
            progress.completed_lessons.len(),
            self.course.lesson_count(),
        );
        progress.total_score += u64::from(score);
        progress.best_session_score = progress.best_session_score.max(score);
        progress.total_time_spent += time_spent;
        progress.last_activity = now;

        let mut course_completed = false;
        if !progress.status.is_finished() {
            if progress.completion_percentage >= 100 {
                progress.status = ProgressStatus::Completed;
                progress.completed_at = Some(now);
                course_completed = true;
            } else {
                progress.status = ProgressStatus::InProgress;
            }
        }

        Ok(LessonRecorded {
            newly_completed,
            course_completed,
        })
    }
}

/// Progress errors.
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("Lesson {lesson_id} is not part of course {course_id} ({lesson_count} lessons)")]
    InvalidLesson {
        course_id: String,
        lesson_id: u32,
        lesson_count: u32,
    },

    #[error("Progress belongs to course {actual}, not {expected}")]
    CourseMismatch { expected: String, actual: String },
}
