use num_traits::Float;

use crate::error::Error;
use crate::session::Session;
use crate::Result;

/// The set of open sessions
///
/// Each session receives the next number from a counter which only ever increases, so numbers
/// are not reused after a session is removed.
#[derive(Clone, Debug)]
pub struct Workbench<E> {
    sessions: Vec<Session<E>>,
    next_number: usize,
}

impl<E: Float> Default for Workbench<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Float> Workbench<E> {
    pub const fn new() -> Self {
        Self {
            sessions: vec![],
            next_number: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// The number the next session will receive
    pub const fn next_number(&self) -> usize {
        self.next_number
    }

    /// Open an empty session
    pub fn add_session(&mut self) -> &mut Session<E> {
        let number = self.take_number();
        self.push(Session::new(number))
    }

    /// Open a session built by `build` from the number it is allocated
    ///
    /// The number is only consumed when `build` succeeds.
    ///
    /// # Errors
    /// - Whatever `build` returns
    /// - [`Error::SessionNumberMismatch`] if the built session carries a number other than the
    ///   one it was given
    pub fn open_session<F>(&mut self, build: F) -> Result<&mut Session<E>>
    where
        F: FnOnce(usize) -> Result<Session<E>>,
    {
        let expected = self.next_number;
        let session = build(expected)?;
        if session.number() != expected {
            return Err(Error::SessionNumberMismatch {
                expected,
                found: session.number(),
            });
        }
        self.take_number();
        Ok(self.push(session))
    }

    /// Close the session numbered `number`, handing it back to the caller
    ///
    /// # Errors
    /// [`Error::SessionNotFound`] if no open session has that number.
    pub fn remove_session(&mut self, number: usize) -> Result<Session<E>> {
        let index = self
            .sessions
            .iter()
            .position(|session| session.number() == number)
            .ok_or(Error::SessionNotFound(number))?;
        tracing::info!(session = number, "session removed");
        Ok(self.sessions.remove(index))
    }

    pub fn session(&self, number: usize) -> Option<&Session<E>> {
        self.sessions
            .iter()
            .find(|session| session.number() == number)
    }

    pub fn session_mut(&mut self, number: usize) -> Option<&mut Session<E>> {
        self.sessions
            .iter_mut()
            .find(|session| session.number() == number)
    }

    /// Open sessions in the order they were added
    pub fn sessions(&self) -> impl ExactSizeIterator<Item = &Session<E>> + '_ {
        self.sessions.iter()
    }

    fn take_number(&mut self) -> usize {
        let number = self.next_number;
        self.next_number += 1;
        number
    }

    fn push(&mut self, session: Session<E>) -> &mut Session<E> {
        tracing::info!(session = session.number(), "session added");
        let index = self.sessions.len();
        self.sessions.push(session);
        &mut self.sessions[index]
    }
}

#[cfg(test)]
mod tests {
    use super::Workbench;
    use crate::error::Error;
    use crate::sample::Sample;
    use crate::session::Session;

    #[test]
    fn sessions_are_numbered_from_one() {
        let mut workbench: Workbench<f64> = Workbench::new();
        assert_eq!(workbench.add_session().number(), 1);
        assert_eq!(workbench.add_session().number(), 2);
        assert_eq!(workbench.len(), 2);
    }

    #[test]
    fn numbers_are_not_reused_after_removal() {
        let mut workbench: Workbench<f64> = Workbench::new();
        workbench.add_session();
        let second = workbench.add_session().number();

        let removed = workbench.remove_session(second).unwrap();
        assert_eq!(removed.number(), second);

        assert_eq!(workbench.add_session().number(), 3);
        assert_eq!(
            workbench.sessions().map(Session::number).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn removing_an_unknown_session_is_reported() {
        let mut workbench: Workbench<f64> = Workbench::new();
        workbench.add_session();

        let error = workbench.remove_session(7).unwrap_err();
        assert!(matches!(error, Error::SessionNotFound(7)));
        assert!(error.is_invalid_argument());
        assert_eq!(workbench.len(), 1);
    }

    #[test]
    fn sessions_are_edited_in_place() {
        let mut workbench: Workbench<f64> = Workbench::default();
        let number = workbench.add_session().number();

        workbench
            .session_mut(number)
            .unwrap()
            .add_sample(Sample::new(1, 2, 3, 0.5)).unwrap();

        assert_eq!(workbench.session(number).unwrap().len(), 1);
        assert!(workbench.session(number + 1).is_none());
    }

    #[test]
    fn failed_open_does_not_consume_a_number() {
        let mut workbench: Workbench<f64> = Workbench::new();

        let result = workbench.open_session(|_| Err(Error::AbsorbanceUnavailable));
        assert!(result.is_err());
        assert_eq!(workbench.next_number(), 1);

        let session = workbench.open_session(|number| Ok(Session::new(number))).unwrap();
        assert_eq!(session.number(), 1);
    }

    #[test]
    fn sessions_built_with_another_number_are_rejected() {
        let mut workbench: Workbench<f64> = Workbench::new();
        workbench.add_session();

        let error = workbench
            .open_session(|_| Ok(Session::new(1)))
            .unwrap_err();
        assert!(matches!(
            error,
            Error::SessionNumberMismatch {
                expected: 2,
                found: 1
            }
        ));
        assert!(error.is_invalid_argument());
        assert_eq!(workbench.len(), 1);
        assert_eq!(workbench.next_number(), 2);
    }
}
