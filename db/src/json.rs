use bimap::BiMap;
use log::{error, info, warn};
use rand::{self, Rng};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::{collections::BTreeMap, fs::File, time::Duration};
use thiserror::Error;

use super::{
    seed::seed_db, username_from_name, ClassUpdate, Database, NewClass, NewScore, NewSubject,
    NewTeacherSubject, NewUser, ScoreFilter, ScoreUpdate, SubjectUpdate, TeacherSubjectFilter,
    TeacherSubjectUpdate, UpdateStatus, PAGE_SIZE,
};
use crate::models::{Class, Score, Subject, TeacherSubject, User};
use periods::canonical_lesson_periods;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("could not access the database file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not (de)serialize the database: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
pub struct JSONDatabase {
    filename: String,
    delay: Duration,
    users: BTreeMap<String, User>,
    tokens: BiMap<String, String>,
    classes: BTreeMap<u32, Class>,
    subjects: BTreeMap<u32, Subject>,
    teacher_subjects: BTreeMap<u32, TeacherSubject>,
    scores: BTreeMap<u32, Score>,
    next_user_id: u32,
    next_class_id: u32,
    next_subject_id: u32,
    next_teacher_subject_id: u32,
    next_score_id: u32,
}

impl JSONDatabase {
    pub fn new(filename: String) -> Self {
        // Try to read from disk
        match Self::from_file(&filename) {
            Ok(db) => return db,
            Err(e) => info!("Starting from a fresh database ({})", e),
        }

        let mut db = Self {
            filename,
            delay: Duration::from_millis(0),
            users: BTreeMap::new(),
            tokens: BiMap::new(),
            classes: BTreeMap::new(),
            subjects: BTreeMap::new(),
            teacher_subjects: BTreeMap::new(),
            scores: BTreeMap::new(),
            next_user_id: 0,
            next_class_id: 0,
            next_subject_id: 0,
            next_teacher_subject_id: 0,
            next_score_id: 0,
        };

        db.reset();

        db
    }

    fn from_file(filename: &str) -> Result<Self, DbError> {
        let contents = {
            let mut file = File::open(filename)?;
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            contents
        };

        let mut db: Self = serde_json::from_str(&contents)?;
        db.filename = filename.to_string();
        Ok(db)
    }

    fn persist(&self) -> Result<(), DbError> {
        let mut output = File::create(&self.filename)?;
        write!(output, "{}", self.dump_as_json()?)?;
        Ok(())
    }

    /// Persists, keeping the in-memory state when the file cannot be written.
    fn save(&self) {
        if let Err(e) = self.persist() {
            error!("Could not save DB to {}: {}", self.filename, e);
        }
    }
}

impl Database for JSONDatabase {
    fn delay_set(&mut self, delay: Duration) {
        self.delay = delay;
        self.save();
    }

    fn delay_get(&self) -> Duration {
        self.delay
    }

    fn reset(&mut self) {
        self.delay = Duration::from_millis(0);
        self.users.clear();
        self.tokens.clear();
        self.classes.clear();
        self.subjects.clear();
        self.teacher_subjects.clear();
        self.scores.clear();
        self.next_user_id = 0;
        self.next_class_id = 0;
        self.next_subject_id = 0;
        self.next_teacher_subject_id = 0;
        self.next_score_id = 0;

        seed_db(self);

        self.save();
    }

    fn seed(
        &mut self,
        users: impl Iterator<Item = NewUser>,
        classes: impl Iterator<Item = NewClass>,
        subjects: impl Iterator<Item = NewSubject>,
        teacher_subjects: impl Iterator<Item = NewTeacherSubject>,
        scores: impl Iterator<Item = NewScore>,
    ) {
        users.for_each(|u| {
            self._user_add(u);
        });
        classes.for_each(|c| {
            self._class_add(c);
        });
        subjects.for_each(|s| {
            self._subject_add(s);
        });
        teacher_subjects.for_each(|t| {
            self._teacher_subject_add(t);
        });
        scores.for_each(|s| {
            self._score_add(s);
        });
        self.save();
    }

    fn dump_as_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self)
    }

    fn auth_login(&mut self, username: &str, password: &str) -> Option<(&User, String)> {
        let user = self.users.get(username)?;

        if password == user.password {
            let mut rng = rand::thread_rng();
            let token: String = std::iter::repeat(())
                .map(|()| rng.sample(rand::distributions::Alphanumeric))
                .take(25)
                .collect();

            self.tokens.insert(token.clone(), user.username.clone());
            self.save();
            Some((user, token))
        } else {
            None
        }
    }

    fn auth_logout(&mut self, token: &str) -> bool {
        let removed = self.tokens.remove_by_left(&token.to_string()).is_some();
        self.save();
        removed
    }

    fn auth_get_user(&self, token: &str) -> Option<&User> {
        let username = self.tokens.get_by_left(&token.to_string())?;
        self.users.get(username)
    }

    fn user_add(&mut self, user: NewUser) -> &User {
        let username = self._user_add(user);
        self.save();
        &self.users[&username]
    }

    fn user_get(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    fn user_get_by_id(&self, id: u32) -> Option<&User> {
        self.users.values().find(|u| u.id == id)
    }

    fn user_update(&mut self, user: User) {
        self.users.insert(user.username.clone(), user);
        self.save();
    }

    fn user_list(
        &self,
        page: Option<usize>,
        query: Option<&str>,
        filter: impl Fn(&User) -> bool,
    ) -> (usize, Vec<&User>) {
        _search(
            self.users.values(),
            |u: &User| u.full_name(),
            page,
            query,
            filter,
        )
    }

    fn user_remove(&mut self, users: &[u32]) -> bool {
        let all_users_ids: Vec<u32> = self.users.values().map(|u| u.id).collect();

        // Check first that all IDS exist
        if !users.iter().all(|id| all_users_ids.contains(id)) {
            return false;
        }

        let removed_usernames: Vec<String> = self
            .users
            .values()
            .filter(|u| users.contains(&u.id))
            .map(|u| u.username.clone())
            .collect();

        for username in removed_usernames {
            self.tokens.remove_by_right(&username);
        }

        self.users.retain(|_, u| !users.contains(&u.id));
        self.scores.retain(|_, s| !users.contains(&s.student_id));
        self.save();
        true
    }

    fn class_list(&self, page: Option<usize>, query: Option<&str>) -> (usize, Vec<&Class>) {
        _search(
            self.classes.values(),
            |c: &Class| c.name.to_string(),
            page,
            query,
            |_| true,
        )
    }

    fn class_add(&mut self, class: NewClass) -> u32 {
        let id = self._class_add(class);
        self.save();
        id
    }

    fn class_remove(&mut self, classes: &[u32]) -> bool {
        // Check first
        if !classes.iter().all(|id| self.classes.contains_key(id)) {
            return false;
        }

        classes.iter().for_each(|id| {
            self.classes.remove(id);
        });

        self.save();
        true
    }

    fn class_get(&self, id: u32) -> Option<&Class> {
        self.classes.get(&id)
    }

    fn class_update(&mut self, id: u32, update: ClassUpdate) -> UpdateStatus {
        let class = match self.classes.get_mut(&id) {
            Some(class) => class,
            None => return UpdateStatus::not_found(),
        };

        let mut updated = false;

        macro_rules! update {
            ($property:ident) => {
                if let Some(value) = update.$property {
                    class.$property = value;
                    updated = true;
                }
            };
        }

        update!(name);
        update!(grade_level);
        update!(school_year);
        update!(homeroom_teacher_id);

        if updated {
            self.save();
        }

        UpdateStatus {
            found: true,
            updated,
        }
    }

    fn subject_list(&self, page: Option<usize>, query: Option<&str>) -> (usize, Vec<&Subject>) {
        _search(
            self.subjects.values(),
            |s: &Subject| format!("{} {}", s.code, s.name),
            page,
            query,
            |_| true,
        )
    }

    fn subject_add(&mut self, subject: NewSubject) -> u32 {
        let id = self._subject_add(subject);
        self.save();
        id
    }

    fn subject_remove(&mut self, subjects: &[u32]) -> bool {
        if !subjects.iter().all(|id| self.subjects.contains_key(id)) {
            return false;
        }

        subjects.iter().for_each(|id| {
            self.subjects.remove(id);
        });

        self.save();
        true
    }

    fn subject_get(&self, id: u32) -> Option<&Subject> {
        self.subjects.get(&id)
    }

    fn subject_update(&mut self, id: u32, update: SubjectUpdate) -> UpdateStatus {
        let subject = match self.subjects.get_mut(&id) {
            Some(subject) => subject,
            None => return UpdateStatus::not_found(),
        };

        let mut updated = false;

        if let Some(name) = update.name {
            subject.name = name;
            updated = true;
        }

        if let Some(code) = update.code {
            subject.code = code;
            updated = true;
        }

        if updated {
            self.save();
        }

        UpdateStatus {
            found: true,
            updated,
        }
    }

    fn teacher_subject_list(&self, filter: &TeacherSubjectFilter) -> Vec<&TeacherSubject> {
        self.teacher_subjects
            .values()
            .filter(|a| filter.matches(a))
            .collect()
    }

    fn teacher_subject_add(&mut self, teacher_subject: NewTeacherSubject) -> u32 {
        let id = self._teacher_subject_add(teacher_subject);
        self.save();
        id
    }

    fn teacher_subject_remove(&mut self, teacher_subjects: &[u32]) -> bool {
        if !teacher_subjects
            .iter()
            .all(|id| self.teacher_subjects.contains_key(id))
        {
            return false;
        }

        teacher_subjects.iter().for_each(|id| {
            self.teacher_subjects.remove(id);
        });

        self.save();
        true
    }

    fn teacher_subject_get(&self, id: u32) -> Option<&TeacherSubject> {
        self.teacher_subjects.get(&id)
    }

    fn teacher_subject_update(&mut self, id: u32, update: TeacherSubjectUpdate) -> UpdateStatus {
        let assignment = match self.teacher_subjects.get_mut(&id) {
            Some(assignment) => assignment,
            None => return UpdateStatus::not_found(),
        };

        let mut updated = false;

        macro_rules! update {
            ($property:ident) => {
                if let Some(value) = update.$property {
                    assignment.$property = value;
                    updated = true;
                }
            };
        }

        update!(teacher_id);
        update!(subject_id);
        update!(class_id);
        update!(semester);
        update!(school_year);

        if let Some(lesson_period) = update.lesson_period {
            assignment.lesson_period = canonical_lesson_periods(&lesson_period);
            updated = true;
        }

        if updated {
            self.save();
        }

        UpdateStatus {
            found: true,
            updated,
        }
    }

    fn score_list(&self, filter: &ScoreFilter) -> Vec<&Score> {
        self.scores.values().filter(|s| filter.matches(s)).collect()
    }

    fn score_add(&mut self, score: NewScore) -> u32 {
        let id = self._score_add(score);
        self.save();
        id
    }

    fn score_remove(&mut self, scores: &[u32]) -> bool {
        if !scores.iter().all(|id| self.scores.contains_key(id)) {
            return false;
        }

        scores.iter().for_each(|id| {
            self.scores.remove(id);
        });

        self.save();
        true
    }

    fn score_get(&self, id: u32) -> Option<&Score> {
        self.scores.get(&id)
    }

    fn score_update(&mut self, id: u32, update: ScoreUpdate) -> UpdateStatus {
        let score = match self.scores.get_mut(&id) {
            Some(score) => score,
            None => return UpdateStatus::not_found(),
        };

        let mut updated = false;

        if let Some(kind) = update.kind {
            score.kind = kind;
            updated = true;
        }

        if let Some(value) = update.value {
            score.value = value;
            updated = true;
        }

        if updated {
            self.save();
        }

        UpdateStatus {
            found: true,
            updated,
        }
    }
}

impl JSONDatabase {
    fn _user_add(&mut self, user: NewUser) -> String {
        let base = username_from_name(&user.first_name, &user.last_name);
        let mut username = base.clone();
        let mut suffix = 2;

        // Homonyms are frequent, keep usernames unique
        while self.users.contains_key(&username) {
            username = format!("{}{}", base, suffix);
            suffix += 1;
        }

        self.users.insert(
            username.clone(),
            User {
                id: self.next_user_id,
                first_name: user.first_name,
                last_name: user.last_name,
                username: username.clone(),
                password: user.password,
                kind: user.kind,
            },
        );

        self.next_user_id += 1;
        username
    }

    fn _class_add(&mut self, class: NewClass) -> u32 {
        let id = self.next_class_id;

        self.classes.insert(
            id,
            Class {
                id,
                name: class.name,
                grade_level: class.grade_level,
                school_year: class.school_year,
                homeroom_teacher_id: class.homeroom_teacher_id,
            },
        );

        self.next_class_id += 1;
        id
    }

    fn _subject_add(&mut self, subject: NewSubject) -> u32 {
        let id = self.next_subject_id;

        self.subjects.insert(
            id,
            Subject {
                id,
                name: subject.name,
                code: subject.code,
            },
        );

        self.next_subject_id += 1;
        id
    }

    fn _teacher_subject_add(&mut self, teacher_subject: NewTeacherSubject) -> u32 {
        let id = self.next_teacher_subject_id;
        let lesson_period = canonical_lesson_periods(&teacher_subject.lesson_period);

        if lesson_period.is_empty() && !teacher_subject.lesson_period.trim().is_empty() {
            warn!(
                "Lesson period {:?} of assignment {} has no usable slot",
                teacher_subject.lesson_period, id
            );
        }

        self.teacher_subjects.insert(
            id,
            TeacherSubject {
                id,
                teacher_id: teacher_subject.teacher_id,
                subject_id: teacher_subject.subject_id,
                class_id: teacher_subject.class_id,
                lesson_period,
                semester: teacher_subject.semester,
                school_year: teacher_subject.school_year,
            },
        );

        self.next_teacher_subject_id += 1;
        id
    }

    fn _score_add(&mut self, score: NewScore) -> u32 {
        let id = self.next_score_id;

        self.scores.insert(
            id,
            Score {
                id,
                student_id: score.student_id,
                subject_id: score.subject_id,
                kind: score.kind,
                value: score.value,
                semester: score.semester,
                school_year: score.school_year,
            },
        );

        self.next_score_id += 1;
        id
    }
}

fn _search<'a, T, F>(
    collection: impl Iterator<Item = &'a T>,
    property: F,
    page: Option<usize>,
    query: Option<&str>,
    custom_filter: impl Fn(&T) -> bool,
) -> (usize, Vec<&'a T>)
where
    T: 'a,
    F: Fn(&T) -> String,
{
    let mut filter = contains_query(query, property);
    let mut total = 0;
    let mut skipped = 0;
    let mut results: Vec<&T> = Vec::new();
    let to_skip = page.map_or(0, |page| (page.max(1) - 1) * PAGE_SIZE);
    let page_size = page.map_or(usize::MAX, |_| PAGE_SIZE);

    for row in collection {
        if !filter(&row) || !custom_filter(row) {
            continue;
        }

        total += 1;

        if skipped < to_skip {
            skipped += 1;
        } else if results.len() < page_size {
            results.push(row);
        }
    }

    (total, results)
}

/// Returns a function to be used as a filter that checks if the provided query is contained in the
/// object string.
fn contains_query<T, F>(query: Option<&str>, property: F) -> impl FnMut(&&T) -> bool
where
    F: Fn(&T) -> String,
{
    let normalize = |s: &str| unidecode::unidecode(s.trim()).to_ascii_lowercase();
    let query = query.map(|d| truncate(d, 50)).map(normalize);

    move |object: &&T| {
        if let Some(query) = &query {
            let name = property(object);
            let name = normalize(&name);
            name.contains(query)
        } else {
            true
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        None => s,
        Some((idx, _)) => &s[..idx],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("Nguyễn", 3), "Ngu");
        assert_eq!(truncate("Lê", 10), "Lê");
    }

    #[test]
    fn query_ignores_accents_and_case() {
        let names = vec!["Nguyễn Văn An".to_string(), "Trần Thị Bình".to_string()];
        let (total, found) = _search(names.iter(), |s: &String| s.clone(), Some(1), Some("BINH"), |_| true);

        assert_eq!(total, 1);
        assert_eq!(found, vec![&names[1]]);
    }

    #[test]
    fn pages_hold_page_size_rows() {
        let numbers: Vec<String> = (0..25).map(|n| n.to_string()).collect();

        let (total, page) = _search(numbers.iter(), |s: &String| s.clone(), Some(3), None, |_| true);
        assert_eq!(total, 25);
        assert_eq!(page.len(), 5);

        let (_, all) = _search(numbers.iter(), |s: &String| s.clone(), None, None, |_| true);
        assert_eq!(all.len(), 25);
    }
}
