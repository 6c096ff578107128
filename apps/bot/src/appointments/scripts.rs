// Page scripts run through WebDriver `execute/sync`; each body returns an array of strings

/// Days the booking calendar marks as available
pub const MARKED_DATES: &str = r#"
const availableDates = [];
const selectors = [
    '.available-date',
    '[data-available="true"]',
    '.calendar-day-available',
    '.ui-state-active',
    '.ui-state-default:not(.ui-state-disabled)'
];
for (const selector of selectors) {
    document.querySelectorAll(selector).forEach(el => {
        const dateText = el.innerText.trim();
        if (dateText) {
            availableDates.push(dateText);
        }
    });
}
return availableDates;
"#;

/// Enabled days of a jQuery UI or bootstrap datepicker, with month and year
pub const DATEPICKER_DAYS: &str = r#"
const calendarDays = Array.from(document.querySelectorAll('[data-handler="selectDay"]'));
if (calendarDays.length > 0) {
    const month = document.querySelector('.ui-datepicker-month')?.innerText.trim() || '';
    const year = document.querySelector('.ui-datepicker-year')?.innerText.trim() || '';
    return calendarDays
        .filter(day => !day.classList.contains('ui-state-disabled'))
        .map(day => `${day.innerText.trim()} de ${month} de ${year}`);
}
const availableDays = Array.from(document.querySelectorAll('.day:not(.disabled)'));
if (availableDays.length > 0) {
    const currentMonth = document.querySelector('.datepicker-switch')?.innerText.trim() || '';
    return availableDays.map(day => `${day.innerText.trim()} ${currentMonth}`);
}
return [];
"#;
